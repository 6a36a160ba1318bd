use crate::classifier::classify;
use crate::config::{self, AppConfig};
use crate::drops;
use crate::library::{self, Library};
use crate::metadata::{Category, ModDetails, PreviewImage};
use crate::stager::Stager;
use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf, vec::IntoIter};

#[derive(Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputFormat::Json),
            "text" => Some(OutputFormat::Text),
            _ => None,
        }
    }
}

enum CliCommand {
    Add(AddOptions),
    List { format: OutputFormat },
    Remove { id: String },
    Paths,
    Help,
    Version,
}

struct AddOptions {
    paths: Vec<PathBuf>,
    name: Option<String>,
    author: Option<String>,
    link: Option<String>,
    description: Option<String>,
    category: Option<Category>,
    preview: Option<PathBuf>,
    format: OutputFormat,
}

pub fn run(args: Vec<String>) -> Result<()> {
    match parse_args(args)? {
        CliCommand::Add(options) => run_add(options),
        CliCommand::List { format } => run_list(format),
        CliCommand::Remove { id } => run_remove(&id),
        CliCommand::Paths => run_paths(),
        CliCommand::Help => {
            print_help();
            Ok(())
        }
        CliCommand::Version => {
            println!("vpkvault {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliCommand> {
    let mut args = args.into_iter();
    let Some(command) = args.next() else {
        return Ok(CliCommand::Help);
    };
    match command.as_str() {
        "add" => parse_add(&mut args),
        "list" => {
            let mut format = OutputFormat::Text;
            while let Some(arg) = args.next() {
                match arg.as_str() {
                    "--format" | "-f" => format = parse_format(&mut args)?,
                    other => bail!("unexpected argument: {other}"),
                }
            }
            Ok(CliCommand::List { format })
        }
        "remove" => {
            let Some(id) = args.next() else {
                bail!("remove requires a mod id");
            };
            Ok(CliCommand::Remove { id })
        }
        "paths" => Ok(CliCommand::Paths),
        "help" | "--help" | "-h" => Ok(CliCommand::Help),
        "version" | "--version" | "-V" => Ok(CliCommand::Version),
        other => bail!("unknown command: {other} (try `vpkvault help`)"),
    }
}

fn parse_add(args: &mut IntoIter<String>) -> Result<CliCommand> {
    let mut options = AddOptions {
        paths: Vec::new(),
        name: None,
        author: None,
        link: None,
        description: None,
        category: None,
        preview: None,
        format: OutputFormat::Text,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--name" | "-n" => options.name = Some(required_value(args, "--name")?),
            "--author" | "-a" => options.author = Some(required_value(args, "--author")?),
            "--link" => options.link = Some(required_value(args, "--link")?),
            "--desc" | "--description" => {
                options.description = Some(required_value(args, "--desc")?);
            }
            "--category" | "-c" => {
                let value = required_value(args, "--category")?;
                let Some(category) = Category::parse(&value) else {
                    bail!("unknown category: {value} (expected one of {})", category_list());
                };
                options.category = Some(category);
            }
            "--preview" | "-p" => {
                options.preview = Some(PathBuf::from(required_value(args, "--preview")?));
            }
            "--format" | "-f" => options.format = parse_format(args)?,
            other if other.starts_with('-') => bail!("unknown option: {other}"),
            other => options.paths.push(PathBuf::from(other)),
        }
    }
    if options.paths.is_empty() {
        bail!("add requires at least one file or folder");
    }
    Ok(CliCommand::Add(options))
}

fn parse_format(args: &mut IntoIter<String>) -> Result<OutputFormat> {
    let value = required_value(args, "--format")?;
    let Some(format) = OutputFormat::parse(&value) else {
        bail!("unknown format: {value} (expected text or json)");
    };
    Ok(format)
}

fn required_value(args: &mut IntoIter<String>, flag: &str) -> Result<String> {
    match args.next() {
        Some(value) => Ok(value),
        None => bail!("{flag} requires a value"),
    }
}

fn run_add(options: AddOptions) -> Result<()> {
    let Some(name) = options
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
    else {
        bail!("add requires --name");
    };

    let data_dir = config::base_data_dir()?;
    let app_config = AppConfig::load_or_create(&data_dir)?;
    let mods_root = app_config.resolve_mods_root(&data_dir);

    let preview = match &options.preview {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("read preview image {}", path.display()))?;
            let file_name = path
                .file_name()
                .and_then(|file_name| file_name.to_str())
                .unwrap_or("preview.png")
                .to_string();
            Some(PreviewImage { file_name, bytes })
        }
        None => None,
    };

    let entries = drops::collect_entries(&options.paths)?;
    let source = classify(entries);
    let details = ModDetails {
        name: name.to_string(),
        author: options.author.clone(),
        link: options.link.clone(),
        description: options.description.clone(),
        preview,
    };
    let category = options.category.unwrap_or(app_config.default_category);

    let staged = Stager::new(&mods_root)
        .stage(source, details, category)
        .context("stage mod")?;

    let mut library = Library::load_or_create(&data_dir)?;
    library.register(staged.metadata.clone());
    library.save(&data_dir)?;

    if let Some(warning) = staged.warning {
        eprintln!("warning: {}", warning.message());
    }

    match options.format {
        OutputFormat::Json => {
            let raw = serde_json::to_string_pretty(&staged.metadata)
                .context("serialize mod metadata")?;
            println!("{raw}");
        }
        OutputFormat::Text => {
            println!("Added {} ({})", staged.metadata.name, staged.id);
            println!("  location: {}", staged.root_dir.display());
            println!("  payload:  {}", staged.payload_path.display());
            println!("  preview:  {}", staged.preview_path.display());
        }
    }
    Ok(())
}

fn run_list(format: OutputFormat) -> Result<()> {
    let data_dir = config::base_data_dir()?;
    fs::create_dir_all(&data_dir).context("create app data dir")?;
    let library = Library::load_or_create(&data_dir)?;
    match format {
        OutputFormat::Json => {
            let raw = serde_json::to_string_pretty(&library.mods)
                .context("serialize mod list")?;
            println!("{raw}");
        }
        OutputFormat::Text => {
            if library.mods.is_empty() {
                println!("No mods in the library");
                return Ok(());
            }
            for entry in &library.mods {
                println!(
                    "{}  {:<10}  {}  ({})",
                    entry.id,
                    entry.category.label(),
                    entry.name,
                    entry.created_at
                );
            }
        }
    }
    Ok(())
}

fn run_remove(id: &str) -> Result<()> {
    let data_dir = config::base_data_dir()?;
    let app_config = AppConfig::load_or_create(&data_dir)?;
    let mods_root = app_config.resolve_mods_root(&data_dir);

    let mut library = Library::load_or_create(&data_dir)?;
    let Some(entry) = library.remove(id) else {
        bail!("no mod with id {id}");
    };
    library.save(&data_dir)?;

    let root = library::mod_root(&mods_root, id);
    if root.exists() {
        fs::remove_dir_all(&root).context("remove mod dir")?;
    }
    println!("Removed {} ({})", entry.name, entry.id);
    Ok(())
}

fn run_paths() -> Result<()> {
    let data_dir = config::base_data_dir()?;
    let app_config = AppConfig::load_or_create(&data_dir)?;
    println!("data dir:  {}", data_dir.display());
    println!("mods root: {}", app_config.resolve_mods_root(&data_dir).display());
    println!("library:   {}", data_dir.join("library.json").display());
    Ok(())
}

fn category_list() -> String {
    let labels: Vec<&str> = Category::ALL.iter().map(|category| category.label()).collect();
    labels.join(", ")
}

fn print_help() {
    println!("vpkvault {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage:");
    println!("  vpkvault add <path>... --name <name> [options]");
    println!("  vpkvault list [--format text|json]");
    println!("  vpkvault remove <id>");
    println!("  vpkvault paths");
    println!();
    println!("Add options:");
    println!("  -n, --name <name>        mod name (required)");
    println!("  -a, --author <author>    mod author");
    println!("      --link <url>         source link");
    println!("      --desc <text>        description");
    println!("  -c, --category <cat>     one of: {}", category_list());
    println!("  -p, --preview <image>    preview image file");
    println!("  -f, --format <fmt>       output format: text or json");
    println!();
    println!("Accepted inputs: a single .vpk file, a single .zip/.rar/.7z archive,");
    println!("or a folder containing .vpk files (only ZIP archives are unpacked;");
    println!("others are stored whole for manual handling).");
}
