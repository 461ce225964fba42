use crate::traits::CatalogueStore;
use crate::types::{FeedItem, Result, SummarizedFeedItem, SummarizerError};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

const RECORD_SUFFIX: &str = ".json";
const MAX_FILE_NAME_BYTES: usize = 255;
/// Added around a key to name its temporary sibling: `.{key}.tmp`.
const TMP_NAME_OVERHEAD: usize = ".".len() + ".tmp".len();

/// Storage key for an item: derived from title and publication date only.
///
/// Two different items sharing both map to the same key; the later write
/// replaces the earlier one.
pub fn storage_key(title: &str, publication_date: &str) -> String {
    let base = sanitize_file_name(&format!("{} (published {})", title, publication_date));
    // Leave room for the temporary name used while writing.
    let base = truncate_to_bytes(&base, MAX_FILE_NAME_BYTES - RECORD_SUFFIX.len() - TMP_NAME_OVERHEAD);
    format!("{}{}", base, RECORD_SUFFIX)
}

/// Strip characters that are unsafe in a file name on common filesystems.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '?' | '<' | '>' | ':' | '*' | '|' | '"'))
        .filter(|c| !c.is_control())
        .collect();

    if cleaned.chars().all(|c| c == '.') || is_windows_reserved(&cleaned) {
        return String::new();
    }

    cleaned.trim_end_matches(['.', ' ']).to_string()
}

fn is_windows_reserved(name: &str) -> bool {
    let stem = name.split('.').next().unwrap_or("").to_ascii_lowercase();
    matches!(stem.as_str(), "con" | "prn" | "aux" | "nul")
        || (stem.len() == 4
            && (stem.starts_with("com") || stem.starts_with("lpt"))
            && stem.as_bytes()[3].is_ascii_digit())
}

fn truncate_to_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn store_error(path: &Path, reason: impl ToString) -> SummarizerError {
    SummarizerError::Store {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// One JSON file per summarized item plus an aggregate catalogue file, all
/// in one directory.
pub struct FsCatalogueStore {
    root: PathBuf,
    catalogue_file_name: String,
}

impl FsCatalogueStore {
    /// Open the store, creating its directory if needed.
    pub async fn open(root: impl Into<PathBuf>, catalogue_file_name: impl Into<String>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| store_error(&root, e))?;

        info!("Catalogue store opened at {}", root.display());
        Ok(Self {
            root,
            catalogue_file_name: catalogue_file_name.into(),
        })
    }

    pub fn catalogue_path(&self) -> PathBuf {
        self.root.join(&self.catalogue_file_name)
    }

    pub fn record_path(&self, title: &str, publication_date: &str) -> PathBuf {
        self.root.join(storage_key(title, publication_date))
    }

    /// Read back the aggregate catalogue as written by the last rebuild.
    pub async fn load_catalogue(&self) -> Result<Vec<SummarizedFeedItem>> {
        let path = self.catalogue_path();
        let bytes = fs::read(&path).await.map_err(|e| store_error(&path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Names of every per-item record, sorted, excluding the catalogue itself
    /// and in-flight temporary files (which end in `.tmp`).
    async fn record_names(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| store_error(&self.root, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| store_error(&self.root, e))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if name == self.catalogue_file_name || !name.ends_with(RECORD_SUFFIX) {
                continue;
            }
            names.push(name);
        }

        names.sort();
        Ok(names)
    }

    /// Write through a temporary sibling so readers never see partial JSON.
    async fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| store_error(path, "invalid file name"))?;
        let tmp_path = self.root.join(format!(".{}.tmp", file_name));

        fs::write(&tmp_path, bytes)
            .await
            .map_err(|e| store_error(&tmp_path, e))?;
        fs::rename(&tmp_path, path)
            .await
            .map_err(|e| store_error(path, e))?;
        Ok(())
    }
}

fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

#[async_trait]
impl CatalogueStore for FsCatalogueStore {
    async fn exists(&self, item: &FeedItem) -> Result<bool> {
        let path = self.record_path(&item.title, &item.publication_date);
        fs::try_exists(&path)
            .await
            .map_err(|e| store_error(&path, e))
    }

    async fn put(&self, item: &SummarizedFeedItem) -> Result<()> {
        let path = self.record_path(&item.title, &item.publication_date);
        let bytes = to_pretty_json(item)?;
        self.write_atomic(&path, &bytes).await?;

        debug!("Stored summary record {}", path.display());
        Ok(())
    }

    async fn rebuild_catalogue(&self) -> Result<usize> {
        let names = self.record_names().await?;
        let mut items = Vec::with_capacity(names.len());

        for name in names {
            let path = self.root.join(&name);
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping unreadable record {}: {}", path.display(), e);
                    continue;
                }
            };
            match serde_json::from_slice::<SummarizedFeedItem>(&bytes) {
                Ok(item) => items.push(item),
                Err(e) => warn!("Skipping malformed record {}: {}", path.display(), e),
            }
        }

        let bytes = serde_json::to_vec(&items)?;
        self.write_atomic(&self.catalogue_path(), &bytes).await?;

        info!(
            "Rebuilt catalogue {} with {} items",
            self.catalogue_path().display(),
            items.len()
        );
        Ok(items.len())
    }
}
