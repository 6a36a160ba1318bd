use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEntry {
    pub name: String,
    pub relative_path: Option<String>,
    pub path: PathBuf,
}

impl DroppedEntry {
    pub fn from_path(path: &Path, relative_path: Option<String>) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_string();
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name,
            relative_path,
            path: path.to_path_buf(),
        })
    }

    pub fn sort_key(&self) -> &str {
        self.relative_path.as_deref().unwrap_or(self.name.as_str())
    }
}

pub fn collect_entries(paths: &[PathBuf]) -> Result<Vec<DroppedEntry>> {
    let mut entries = Vec::new();
    for path in paths {
        if path.is_dir() {
            collect_dir_entries(path, &mut entries)?;
        } else if path.is_file() {
            if is_ignored_path(path) {
                continue;
            }
            if let Some(entry) = DroppedEntry::from_path(path, None) {
                entries.push(entry);
            }
        } else {
            bail!("no such file or directory: {}", path.display());
        }
    }
    entries.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
    Ok(entries)
}

fn collect_dir_entries(root: &Path, entries: &mut Vec<DroppedEntry>) -> Result<()> {
    let folder = root
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string());
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.context("walk dropped folder")?;
        if !entry.file_type().is_file() || is_ignored_path(entry.path()) {
            continue;
        }
        let rel = entry.path().strip_prefix(root).context("rel path")?;
        let rel = rel.to_string_lossy().replace('\\', "/");
        let relative = match &folder {
            Some(folder) => format!("{folder}/{rel}"),
            None => rel,
        };
        if let Some(dropped) = DroppedEntry::from_path(entry.path(), Some(relative)) {
            entries.push(dropped);
        }
    }
    Ok(())
}

fn is_ignored_path(path: &Path) -> bool {
    path.components().any(|component| {
        let part = component.as_os_str().to_string_lossy();
        part.eq_ignore_ascii_case("__MACOSX")
            || part.eq_ignore_ascii_case(".ds_store")
            || part.eq_ignore_ascii_case("thumbs.db")
            || part == ".git"
            || part == ".svn"
            || part == ".vscode"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, rel.as_bytes()).unwrap();
    }

    #[test]
    fn file_argument_becomes_entry_without_relative_path() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "SkinPack.vpk");

        let entries = collect_entries(&[dir.path().join("SkinPack.vpk")]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "SkinPack.vpk");
        assert_eq!(entries[0].relative_path, None);
    }

    #[test]
    fn folder_argument_prefixes_relative_paths_with_folder_name() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "pack/readme.txt");
        write_file(dir.path(), "pack/sub/b.vpk");

        let entries = collect_entries(&[dir.path().join("pack")]).unwrap();
        assert_eq!(entries.len(), 2);
        let rels: Vec<&str> = entries
            .iter()
            .map(|entry| entry.relative_path.as_deref().unwrap())
            .collect();
        assert_eq!(rels, vec!["pack/readme.txt", "pack/sub/b.vpk"]);
        for entry in &entries {
            assert!(entry
                .relative_path
                .as_deref()
                .unwrap()
                .ends_with(&entry.name));
        }
    }

    #[test]
    fn junk_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "pack/a.vpk");
        write_file(dir.path(), "pack/.DS_Store");
        write_file(dir.path(), "pack/__MACOSX/a.vpk");
        write_file(dir.path(), "pack/Thumbs.db");

        let entries = collect_entries(&[dir.path().join("pack")]).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.vpk");
    }

    #[test]
    fn output_is_sorted_regardless_of_walk_order() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "pack/z.vpk");
        write_file(dir.path(), "pack/a.vpk");
        write_file(dir.path(), "pack/m/b.vpk");

        let entries = collect_entries(&[dir.path().join("pack")]).unwrap();
        let rels: Vec<&str> = entries
            .iter()
            .map(|entry| entry.relative_path.as_deref().unwrap())
            .collect();
        assert_eq!(rels, vec!["pack/a.vpk", "pack/m/b.vpk", "pack/z.vpk"]);
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(collect_entries(&[dir.path().join("nope.vpk")]).is_err());
    }
}
