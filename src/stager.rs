use crate::classifier::{is_packed_asset_name, is_zip_name, ClassifiedSource};
use crate::drops::DroppedEntry;
use crate::metadata::{
    Category, ModDetails, ModKind, ModMetadata, PreviewImage, DEFAULT_AUTHOR, METADATA_FILE_NAME,
    METADATA_SCHEMA_VERSION,
};
use blake3::Hasher;
use filetime::{set_file_mtime, FileTime};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use walkdir::WalkDir;
use zip::ZipArchive;

pub const FILES_DIR_NAME: &str = "files";
pub const PLACEHOLDER_PREVIEW_NAME: &str = "preview.svg";

pub const PLACEHOLDER_PREVIEW_SVG: &str = concat!(
    "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"256\" height=\"256\" viewBox=\"0 0 256 256\">",
    "<rect width=\"256\" height=\"256\" fill=\"#23262b\"/>",
    "<rect x=\"72\" y=\"84\" width=\"112\" height=\"88\" rx=\"8\" fill=\"none\" stroke=\"#8a919c\" stroke-width=\"6\"/>",
    "<path d=\"M72 112h112\" stroke=\"#8a919c\" stroke-width=\"6\"/>",
    "<text x=\"128\" y=\"204\" text-anchor=\"middle\" font-family=\"sans-serif\" font-size=\"20\" fill=\"#8a919c\">VPK</text>",
    "</svg>\n",
);

const PREVIEW_IMAGE_EXTS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "bmp"];

#[derive(Debug, Error)]
pub enum StageError {
    #[error("no recognizable mod source in the dropped files")]
    NoSource,
    #[error("{op}: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

impl StageError {
    fn io(op: &'static str) -> impl FnOnce(io::Error) -> StageError {
        move |source| StageError::Io { op, source }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageWarning {
    PayloadNotFoundInArchive,
}

impl StageWarning {
    pub fn message(self) -> &'static str {
        match self {
            StageWarning::PayloadNotFoundInArchive => {
                "no payload found inside archive; archive stored as-is for manual handling"
            }
        }
    }
}

#[derive(Debug)]
pub struct StagedMod {
    pub id: String,
    pub root_dir: PathBuf,
    pub payload_path: PathBuf,
    pub preview_path: PathBuf,
    pub metadata: ModMetadata,
    pub warning: Option<StageWarning>,
}

struct PopulatedMod {
    metadata: ModMetadata,
    payload_rel: PathBuf,
    preview_rel: String,
    warning: Option<StageWarning>,
}

pub struct Stager {
    mods_root: PathBuf,
}

impl Stager {
    pub fn new(mods_root: impl Into<PathBuf>) -> Self {
        Self {
            mods_root: mods_root.into(),
        }
    }

    pub fn stage(
        &self,
        source: ClassifiedSource,
        details: ModDetails,
        category: Category,
    ) -> Result<StagedMod, StageError> {
        if matches!(source, ClassifiedSource::Unrecognized) {
            return Err(StageError::NoSource);
        }

        let id = generate_local_id(&details.name);
        let work_dir = self.make_work_dir()?;
        match populate(&work_dir, &id, &source, details, category) {
            Ok(populated) => {
                let root_dir = self.mods_root.join(&id);
                if let Err(source) = promote(&work_dir, &root_dir) {
                    let _ = fs::remove_dir_all(&work_dir);
                    return Err(StageError::Io {
                        op: "promote staged mod",
                        source,
                    });
                }
                Ok(StagedMod {
                    id,
                    payload_path: root_dir.join(&populated.payload_rel),
                    preview_path: root_dir.join(&populated.preview_rel),
                    metadata: populated.metadata,
                    warning: populated.warning,
                    root_dir,
                })
            }
            Err(err) => {
                let _ = fs::remove_dir_all(&work_dir);
                Err(err)
            }
        }
    }

    fn make_work_dir(&self) -> Result<PathBuf, StageError> {
        let tmp_root = self.mods_root.join("tmp");
        fs::create_dir_all(&tmp_root).map_err(StageError::io("create staging root"))?;
        let counter = STAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let work_dir = tmp_root.join(format!("stage-{nanos}-{counter}"));
        fs::create_dir_all(&work_dir).map_err(StageError::io("create staging dir"))?;
        Ok(work_dir)
    }
}

fn populate(
    work_dir: &Path,
    id: &str,
    source: &ClassifiedSource,
    details: ModDetails,
    category: Category,
) -> Result<PopulatedMod, StageError> {
    let files_dir = work_dir.join(FILES_DIR_NAME);
    fs::create_dir_all(&files_dir).map_err(StageError::io("create files dir"))?;

    let preview_rel = write_preview(work_dir, details.preview.as_ref());

    let (payload_rel, mut warning) = match source {
        ClassifiedSource::SinglePackedAsset { entry } => {
            copy_payload(entry, &files_dir.join(&entry.name))?;
            (PathBuf::from(FILES_DIR_NAME).join(&entry.name), None)
        }
        ClassifiedSource::FolderWithPackedAssets { entries, .. } => {
            // Single payload per mod: the lexically first match wins.
            let mut sorted: Vec<&DroppedEntry> = entries.iter().collect();
            sorted.sort_by(|a, b| a.name.cmp(&b.name));
            let entry = sorted.first().ok_or(StageError::NoSource)?;
            copy_payload(entry, &files_dir.join(&entry.name))?;
            (PathBuf::from(FILES_DIR_NAME).join(&entry.name), None)
        }
        ClassifiedSource::SingleArchive { entry } => stage_archive(work_dir, &files_dir, entry)?,
        ClassifiedSource::Unrecognized => return Err(StageError::NoSource),
    };

    // An archive drop must end up with either an extracted payload under
    // files/ or the untouched archive in the mod root.
    if let ClassifiedSource::SingleArchive { entry } = source {
        if !dir_has_packed_asset(&files_dir) {
            let fallback = work_dir.join(&entry.name);
            if !fallback.exists() {
                copy_payload(entry, &fallback)?;
                warning = Some(StageWarning::PayloadNotFoundInArchive);
            }
        }
    }

    let metadata = build_metadata(id, details, category, &preview_rel);
    let raw = serde_json::to_string_pretty(&metadata).map_err(|err| StageError::Io {
        op: "serialize metadata.json",
        source: io::Error::new(io::ErrorKind::InvalidData, err),
    })?;
    fs::write(work_dir.join(METADATA_FILE_NAME), raw)
        .map_err(StageError::io("write metadata.json"))?;

    Ok(PopulatedMod {
        metadata,
        payload_rel,
        preview_rel,
        warning,
    })
}

fn stage_archive(
    work_dir: &Path,
    files_dir: &Path,
    entry: &DroppedEntry,
) -> Result<(PathBuf, Option<StageWarning>), StageError> {
    if is_zip_name(&entry.name) {
        if let Some(inner) = extract_zip_payload(entry, files_dir)? {
            return Ok((PathBuf::from(FILES_DIR_NAME).join(inner), None));
        }
    }
    let dest = work_dir.join(&entry.name);
    copy_payload(entry, &dest)?;
    Ok((
        PathBuf::from(&entry.name),
        Some(StageWarning::PayloadNotFoundInArchive),
    ))
}

fn extract_zip_payload(
    entry: &DroppedEntry,
    files_dir: &Path,
) -> Result<Option<String>, StageError> {
    let Ok(file) = fs::File::open(&entry.path) else {
        return Ok(None);
    };
    let Ok(mut archive) = ZipArchive::new(file) else {
        return Ok(None);
    };

    let mut matches: Vec<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/') && is_packed_asset_name(name))
        .map(|name| name.to_string())
        .collect();
    if matches.is_empty() {
        return Ok(None);
    }
    matches.sort();
    let inner = matches.remove(0);

    let Ok(mut source) = archive.by_name(&inner) else {
        return Ok(None);
    };
    let base = inner_base_name(&inner);
    let mut out = fs::File::create(files_dir.join(&base))
        .map_err(StageError::io("create extracted payload"))?;
    io::copy(&mut source, &mut out).map_err(StageError::io("extract archive payload"))?;
    Ok(Some(base))
}

fn inner_base_name(name: &str) -> String {
    let normalized = name.replace('\\', "/");
    match normalized.rsplit('/').next() {
        Some(base) if !base.is_empty() => base.to_string(),
        _ => normalized,
    }
}

fn copy_payload(entry: &DroppedEntry, dest: &Path) -> Result<(), StageError> {
    fs::copy(&entry.path, dest).map_err(StageError::io("copy payload"))?;
    preserve_mtime(&entry.path, dest);
    Ok(())
}

fn preserve_mtime(source: &Path, dest: &Path) {
    let Ok(meta) = fs::metadata(source) else {
        return;
    };
    let Ok(modified) = meta.modified() else {
        return;
    };
    let Ok(duration) = modified.duration_since(UNIX_EPOCH) else {
        return;
    };
    let mtime = FileTime::from_unix_time(duration.as_secs() as i64, 0);
    let _ = set_file_mtime(dest, mtime);
}

fn dir_has_packed_asset(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries.flatten().any(|entry| {
        entry
            .file_name()
            .to_str()
            .map(is_packed_asset_name)
            .unwrap_or(false)
    })
}

// Preview trouble never aborts staging; the payload matters more.
fn write_preview(work_dir: &Path, preview: Option<&PreviewImage>) -> String {
    match preview {
        Some(image) => {
            let name = format!("preview.{}", preview_ext(&image.file_name));
            let _ = fs::write(work_dir.join(&name), &image.bytes);
            name
        }
        None => {
            let _ = fs::write(
                work_dir.join(PLACEHOLDER_PREVIEW_NAME),
                PLACEHOLDER_PREVIEW_SVG,
            );
            PLACEHOLDER_PREVIEW_NAME.to_string()
        }
    }
}

fn preview_ext(file_name: &str) -> String {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if PREVIEW_IMAGE_EXTS.contains(&ext.as_str()) {
        ext
    } else {
        "png".to_string()
    }
}

fn build_metadata(
    id: &str,
    details: ModDetails,
    category: Category,
    preview_rel: &str,
) -> ModMetadata {
    let author = details
        .author
        .map(|author| author.trim().to_string())
        .filter(|author| !author.is_empty())
        .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());
    ModMetadata {
        id: id.to_string(),
        kind: ModKind::Local,
        name: details.name.trim().to_string(),
        author,
        link: details.link,
        description: details.description,
        category,
        created_at: now_rfc3339(),
        preview: preview_rel.to_string(),
        schema: METADATA_SCHEMA_VERSION,
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

fn promote(work_dir: &Path, root_dir: &Path) -> io::Result<()> {
    if let Some(parent) = root_dir.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::rename(work_dir, root_dir) {
        Ok(()) => Ok(()),
        Err(_) => {
            copy_dir(work_dir, root_dir)?;
            fs::remove_dir_all(work_dir)
        }
    }
}

fn copy_dir(source: &Path, dest: &Path) -> io::Result<()> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let rel = match entry.path().strip_prefix(source) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            preserve_mtime(entry.path(), &target);
        }
    }
    Ok(())
}

static STAGE_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn generate_local_id(seed: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(seed.as_bytes());
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    hasher.update(&nanos.to_le_bytes());
    hasher.update(&STAGE_COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    format!("local-{}", hasher.finalize().to_hex())
}
