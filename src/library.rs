use crate::metadata::ModMetadata;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Library {
    pub mods: Vec<ModMetadata>,
}

impl Library {
    pub fn load_or_create(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("library.json");
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read library.json")?;
            let library = serde_json::from_str(&raw).context("parse library.json")?;
            return Ok(library);
        }
        let library = Library::default();
        library.save(data_dir)?;
        Ok(library)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let path = data_dir.join("library.json");
        let raw = serde_json::to_string_pretty(self).context("serialize library.json")?;
        fs::write(path, raw).context("write library.json")?;
        Ok(())
    }

    pub fn register(&mut self, metadata: ModMetadata) {
        self.mods.retain(|entry| entry.id != metadata.id);
        self.mods.push(metadata);
    }

    pub fn remove(&mut self, id: &str) -> Option<ModMetadata> {
        let index = self.mods.iter().position(|entry| entry.id == id)?;
        Some(self.mods.remove(index))
    }
}

pub fn mod_root(mods_root: &Path, id: &str) -> PathBuf {
    mods_root.join(id)
}
