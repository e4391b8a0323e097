//! Access to one cache entry and its expiry record.

use std::fmt;
use std::sync::Arc;

use reqstash_core::expiry::parse_expiry;
use reqstash_core::{CacheKey, DataType, ResponseData, Storage, StorageError, StorageResult};

use crate::metrics;

/// Why an entry was removed before being reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// The recorded expiry passed.
    Expired,
    /// The caller's validity predicate returned `false`.
    Rejected,
    /// Writing the entry or its expiry record failed.
    WriteFailed,
    /// The stored payload could not be parsed.
    Corrupt,
}

impl Invalidation {
    /// Label used in logs and metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Invalidation::Expired => "expired",
            Invalidation::Rejected => "rejected",
            Invalidation::WriteFailed => "write_failed",
            Invalidation::Corrupt => "corrupt",
        }
    }
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cache entry slot in a particular store.
///
/// Storage errors on reads and removals are logged and treated as absence;
/// nothing in here propagates them.
#[derive(Clone)]
pub(crate) struct CacheEntry {
    storage: Arc<dyn Storage>,
    key: CacheKey,
    record_key: String,
}

impl CacheEntry {
    pub(crate) fn new(storage: Arc<dyn Storage>, key: CacheKey, suffix: &str) -> Self {
        let record_key = key.record_key(suffix);
        Self {
            storage,
            key,
            record_key,
        }
    }

    pub(crate) fn key(&self) -> &CacheKey {
        &self.key
    }

    pub(crate) fn backend(&self) -> &str {
        self.storage.name()
    }

    /// Stored payload; empty strings count as absent.
    pub(crate) fn read(&self) -> Option<String> {
        match self.storage.get(self.key.as_str()) {
            Ok(value) => value.filter(|value| !value.is_empty()),
            Err(err) => {
                tracing::warn!(key = %self.key, backend = self.backend(), error = %err, "cache read failed");
                None
            }
        }
    }

    /// Recorded expiry in epoch milliseconds; `0` when nothing usable is recorded.
    pub(crate) fn expiry(&self) -> i64 {
        let raw = match self.storage.get(&self.record_key) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(key = %self.record_key, backend = self.backend(), error = %err, "expiry record read failed");
                None
            }
        };
        parse_expiry(raw.as_deref())
    }

    /// Writes `data` and, when given, a fresh expiry record.
    ///
    /// The record is only written once the entry is in place. Any failure
    /// removes both keys.
    pub(crate) fn store(&self, data: &ResponseData, data_type: DataType, expire: Option<i64>) {
        if let Err(err) = self.try_store(data, data_type, expire) {
            tracing::warn!(key = %self.key, backend = self.backend(), error = %err, "cache write failed, discarding entry");
            metrics::record_write_error(self.backend());
            self.invalidate(Invalidation::WriteFailed);
            return;
        }
        tracing::debug!(key = %self.key, backend = self.backend(), expire, "response cached");
        metrics::record_write(self.backend());
    }

    fn try_store(
        &self,
        data: &ResponseData,
        data_type: DataType,
        expire: Option<i64>,
    ) -> StorageResult<()> {
        let value = data.to_cache_string(data_type).map_err(StorageError::from)?;
        self.storage.set(self.key.as_str(), &value)?;
        if let Some(expire) = expire {
            self.storage.set(&self.record_key, &expire.to_string())?;
        }
        Ok(())
    }

    /// Removes the entry and its expiry record.
    ///
    /// Returns whether an entry was stored; only then is the invalidation
    /// counted.
    pub(crate) fn invalidate(&self, reason: Invalidation) -> bool {
        let present = matches!(self.storage.get(self.key.as_str()), Ok(Some(_)));
        for key in [self.key.as_str(), self.record_key.as_str()] {
            if let Err(err) = self.storage.remove(key) {
                tracing::warn!(key, backend = self.backend(), error = %err, "cache removal failed");
            }
        }
        if present {
            tracing::debug!(key = %self.key, %reason, "cache entry invalidated");
            metrics::record_invalidation(self.backend(), reason);
        }
        present
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("backend", &self.storage.name())
            .field("key", &self.key)
            .field("record_key", &self.record_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use reqstash_backend::MemoryStorage;
    use serde_json::json;

    use super::*;

    fn entry(storage: &MemoryStorage) -> CacheEntry {
        CacheEntry::new(
            Arc::new(storage.clone()),
            CacheKey::from("/postsGET"),
            "_cachettl",
        )
    }

    #[test]
    fn test_empty_value_reads_as_absent() {
        let storage = MemoryStorage::new();
        storage.set("/postsGET", "").unwrap();
        assert_eq!(entry(&storage).read(), None);
    }

    #[test]
    fn test_store_writes_entry_then_record() {
        let storage = MemoryStorage::new();
        let entry = entry(&storage);
        entry.store(&ResponseData::Json(json!([{"id": 1}])), DataType::Json, Some(42));

        assert_eq!(entry.read().as_deref(), Some(r#"[{"id":1}]"#));
        assert_eq!(entry.expiry(), 42);
    }

    #[test]
    fn test_store_without_expiry_keeps_existing_record() {
        let storage = MemoryStorage::new();
        storage.set("/postsGET_cachettl", "99").unwrap();
        let entry = entry(&storage);
        entry.store(&ResponseData::Text("body".into()), DataType::Text, None);

        assert_eq!(entry.read().as_deref(), Some("body"));
        assert_eq!(entry.expiry(), 99);
    }

    #[test]
    fn test_failed_write_removes_both_keys() {
        let storage = MemoryStorage::with_quota(30);
        storage.set("/postsGET_cachettl", "99").unwrap();
        let entry = entry(&storage);
        entry.store(
            &ResponseData::Text("a body far larger than the quota".into()),
            DataType::Text,
            None,
        );

        assert!(storage.is_empty());
    }

    #[test]
    fn test_invalidate_removes_both_keys() {
        let storage = MemoryStorage::new();
        storage.set("/postsGET", "x").unwrap();
        storage.set("/postsGET_cachettl", "1").unwrap();
        assert!(entry(&storage).invalidate(Invalidation::Expired));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_invalidating_cold_key_is_not_counted() {
        let storage = MemoryStorage::new();
        storage.set("/postsGET_cachettl", "1").unwrap();
        assert!(!entry(&storage).invalidate(Invalidation::Rejected));
        assert!(storage.is_empty());
    }
}
