use crate::drops::DroppedEntry;
use std::path::Path;

pub const PACKED_ASSET_EXT: &str = "vpk";

const ARCHIVE_EXTS: [&str; 3] = ["zip", "rar", "7z"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedSource {
    SinglePackedAsset {
        entry: DroppedEntry,
    },
    SingleArchive {
        entry: DroppedEntry,
    },
    FolderWithPackedAssets {
        entries: Vec<DroppedEntry>,
        folder_name: Option<String>,
    },
    Unrecognized,
}

pub fn classify(mut entries: Vec<DroppedEntry>) -> ClassifiedSource {
    if entries.is_empty() {
        return ClassifiedSource::Unrecognized;
    }

    if entries.len() == 1 {
        let entry = entries.remove(0);
        if is_packed_asset_name(&entry.name) {
            return ClassifiedSource::SinglePackedAsset { entry };
        }
        if is_archive_name(&entry.name) {
            return ClassifiedSource::SingleArchive { entry };
        }
        return ClassifiedSource::Unrecognized;
    }

    let matches: Vec<DroppedEntry> = entries
        .into_iter()
        .filter(|entry| is_packed_asset_name(&entry.name))
        .collect();
    if matches.is_empty() {
        return ClassifiedSource::Unrecognized;
    }
    let folder_name = matches.first().and_then(folder_prefix);
    ClassifiedSource::FolderWithPackedAssets {
        entries: matches,
        folder_name,
    }
}

pub fn is_packed_asset_name(name: &str) -> bool {
    name_ext(name)
        .map(|ext| ext.eq_ignore_ascii_case(PACKED_ASSET_EXT))
        .unwrap_or(false)
}

pub fn is_archive_name(name: &str) -> bool {
    name_ext(name)
        .map(|ext| {
            ARCHIVE_EXTS
                .iter()
                .any(|archive| ext.eq_ignore_ascii_case(archive))
        })
        .unwrap_or(false)
}

pub fn is_zip_name(name: &str) -> bool {
    name_ext(name)
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

fn name_ext(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|ext| ext.to_str())
}

fn folder_prefix(entry: &DroppedEntry) -> Option<String> {
    let rel = entry.relative_path.as_deref()?;
    let (first, _) = rel.split_once('/')?;
    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn entry(name: &str) -> DroppedEntry {
        DroppedEntry::from_path(Path::new(name), None).unwrap()
    }

    fn entry_in(rel: &str) -> DroppedEntry {
        DroppedEntry::from_path(Path::new(rel), Some(rel.to_string())).unwrap()
    }

    #[test]
    fn single_packed_asset_any_case() {
        for name in ["SkinPack.vpk", "SKINPACK.VPK", "skinpack.Vpk"] {
            let source = classify(vec![entry(name)]);
            match source {
                ClassifiedSource::SinglePackedAsset { entry } => assert_eq!(entry.name, name),
                other => panic!("expected SinglePackedAsset, got {other:?}"),
            }
        }
    }

    #[test]
    fn single_archive_any_case() {
        for name in ["bundle.zip", "bundle.ZIP", "bundle.rar", "bundle.7Z"] {
            let source = classify(vec![entry(name)]);
            match source {
                ClassifiedSource::SingleArchive { entry } => assert_eq!(entry.name, name),
                other => panic!("expected SingleArchive, got {other:?}"),
            }
        }
    }

    #[test]
    fn multi_entry_keeps_exactly_the_matching_subset() {
        let source = classify(vec![
            entry_in("a/readme.txt"),
            entry_in("a/b.vpk"),
            entry_in("a/notes.md"),
            entry_in("a/c.vpk"),
        ]);
        match source {
            ClassifiedSource::FolderWithPackedAssets {
                entries,
                folder_name,
            } => {
                let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
                assert_eq!(names, vec!["b.vpk", "c.vpk"]);
                assert_eq!(folder_name.as_deref(), Some("a"));
            }
            other => panic!("expected FolderWithPackedAssets, got {other:?}"),
        }
    }

    #[test]
    fn folder_name_absent_without_relative_paths() {
        let source = classify(vec![entry("b.vpk"), entry("c.vpk")]);
        match source {
            ClassifiedSource::FolderWithPackedAssets { folder_name, .. } => {
                assert_eq!(folder_name, None);
            }
            other => panic!("expected FolderWithPackedAssets, got {other:?}"),
        }
    }

    #[test]
    fn archives_do_not_count_in_multi_entry_drops() {
        let source = classify(vec![entry("bundle.zip"), entry("readme.txt")]);
        assert_eq!(source, ClassifiedSource::Unrecognized);
    }

    #[test]
    fn empty_and_unmatched_inputs_are_unrecognized() {
        assert_eq!(classify(Vec::new()), ClassifiedSource::Unrecognized);
        assert_eq!(classify(vec![entry("readme.txt")]), ClassifiedSource::Unrecognized);
        assert_eq!(
            classify(vec![entry("readme.txt"), entry("notes.md")]),
            ClassifiedSource::Unrecognized
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let input = || vec![entry_in("a/b.vpk"), entry_in("a/c.vpk")];
        assert_eq!(classify(input()), classify(input()));
    }
}
