//! Durable JSON-file store.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use reqstash_core::{Storage, StorageError, StorageResult};
use smol_str::SmolStr;

use crate::entry_size;
use crate::metrics::record_capacity;

/// File name used when the configured path is a directory.
const DEFAULT_FILE_NAME: &str = "reqstash.json";

/// Disk-backed store keeping every entry in a single JSON document.
///
/// Use this when cached responses must survive restarts; it is the usual
/// default durable store. Entries are loaded when the store opens and every
/// mutation is written through to disk (temporary file, then rename) before
/// it returns, so a failed write leaves both memory and disk unchanged.
///
/// ```no_run
/// use reqstash_backend::FileStorage;
///
/// let storage = FileStorage::builder()
///     .path("/var/cache/myapp")
///     .max_bytes(5 * 1024 * 1024) // 5 MB
///     .build()?;
/// # Ok::<(), reqstash_core::StorageError>(())
/// ```
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
    max_bytes: Option<u64>,
    label: SmolStr,
}

impl FileStorage {
    /// Starts building a new store.
    pub fn builder() -> FileStorageBuilder {
        FileStorageBuilder::default()
    }

    /// Opens (or creates) the store at `path` without a quota.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::builder().path(path).build()
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        // Entries are only replaced wholesale after a successful persist.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        record_capacity(&self.label, entries.len() as u64, used_bytes(entries));
        Ok(())
    }
}

fn used_bytes(entries: &BTreeMap<String, String>) -> u64 {
    entries
        .iter()
        .map(|(key, value)| entry_size(key, value))
        .sum()
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.lock();

        if let Some(limit) = self.max_bytes {
            let replaced = entries
                .get(key)
                .map(|old| entry_size(key, old))
                .unwrap_or(0);
            let needed = used_bytes(&entries).saturating_sub(replaced) + entry_size(key, value);
            if needed > limit {
                return Err(StorageError::QuotaExceeded { needed, limit });
            }
        }

        let mut updated = entries.clone();
        updated.insert(key.to_string(), value.to_string());
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.lock();
        if !entries.contains_key(key) {
            return Ok(());
        }

        let mut updated = entries.clone();
        updated.remove(key);
        self.persist(&updated)?;
        *entries = updated;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Builder for [`FileStorage`].
///
/// ```no_run
/// use reqstash_backend::FileStorage;
///
/// let storage = FileStorage::builder()
///     .path("/var/cache/myapp/responses.json")
///     .label("responses")
///     .build()?;
/// # Ok::<(), reqstash_core::StorageError>(())
/// ```
#[derive(Debug, Default)]
pub struct FileStorageBuilder {
    path: Option<PathBuf>,
    max_bytes: Option<u64>,
    label: Option<SmolStr>,
}

impl FileStorageBuilder {
    /// Location of the store.
    ///
    /// If path is a directory, creates `reqstash.json` inside it.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Caps the total size of keys and values.
    ///
    /// Writes beyond the cap fail with `QuotaExceeded`; nothing is evicted.
    pub fn max_bytes(mut self, bytes: u64) -> Self {
        self.max_bytes = Some(bytes);
        self
    }

    /// Label used in logs and metrics. Default: `"file"`.
    pub fn label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Opens the store, loading existing entries.
    ///
    /// # Errors
    ///
    /// Fails when no path was given, the file cannot be read, or its content
    /// is not a JSON object of strings.
    pub fn build(self) -> StorageResult<FileStorage> {
        let path = self.path.ok_or_else(|| {
            StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "file storage requires a path",
            ))
        })?;
        let path = if path.is_dir() {
            path.join(DEFAULT_FILE_NAME)
        } else {
            path
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let entries: BTreeMap<String, String> = match fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };

        let label = self.label.unwrap_or(SmolStr::new_static("file"));
        tracing::debug!(path = %path.display(), entries = entries.len(), backend = %label, "file storage opened");

        Ok(FileStorage {
            path,
            entries: Mutex::new(entries),
            max_bytes: self.max_bytes,
            label,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_directory_path_gets_default_file() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        assert_eq!(storage.path(), dir.path().join("reqstash.json"));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set("/postsGET", r#"[{"id":1}]"#).unwrap();
            storage.set("/postsGET_cachettl", "1700000300000").unwrap();
            storage.set("gone", "x").unwrap();
            storage.remove("gone").unwrap();
        }

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.len(), 2);
        assert_eq!(
            storage.get("/postsGET").unwrap().as_deref(),
            Some(r#"[{"id":1}]"#)
        );
        assert_eq!(storage.get("gone").unwrap(), None);
    }

    #[test]
    fn test_quota_leaves_disk_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        {
            let storage = FileStorage::builder().path(&path).max_bytes(8).build().unwrap();
            storage.set("k", "v").unwrap();
            let err = storage.set("big", "0123456789").unwrap_err();
            assert!(matches!(err, StorageError::QuotaExceeded { limit: 8, .. }));
        }

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("big").unwrap(), None);
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            FileStorage::open(&path),
            Err(StorageError::Format(_))
        ));
    }

    #[test]
    fn test_missing_path_is_an_error() {
        assert!(matches!(
            FileStorage::builder().build(),
            Err(StorageError::Io(_))
        ));
    }
}
