mod classifier;
mod cli;
mod config;
mod drops;
mod library;
mod metadata;
mod stager;

use anyhow::Result;

fn main() -> Result<()> {
    cli::run(std::env::args().skip(1).collect())
}
