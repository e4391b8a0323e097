//! In-memory store.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use reqstash_core::{Storage, StorageError, StorageResult};
use smol_str::SmolStr;

use crate::entry_size;
use crate::metrics::record_capacity;

/// Concurrent in-memory store backed by [`DashMap`].
///
/// An optional byte quota makes writes fail with
/// [`StorageError::QuotaExceeded`] instead of growing past the limit, which
/// is how a full browser-style store behaves. Nothing is evicted.
///
/// ```
/// use reqstash_backend::MemoryStorage;
/// use reqstash_core::Storage;
///
/// let storage = MemoryStorage::with_quota(16);
/// storage.set("a", "1").unwrap();
/// assert!(storage.set("b", "a value that is far too long").is_err());
/// assert_eq!(storage.get("a").unwrap().as_deref(), Some("1"));
/// ```
///
/// Cloning is cheap; clones share the same entries.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    entries: Arc<DashMap<String, String>>,
    used: Arc<AtomicU64>,
    quota: Option<u64>,
    label: SmolStr,
}

impl MemoryStorage {
    /// Unbounded store.
    pub fn new() -> Self {
        Self {
            label: SmolStr::new_static("memory"),
            ..Self::default()
        }
    }

    /// Store refusing writes beyond `max_bytes` of keys and values.
    pub fn with_quota(max_bytes: u64) -> Self {
        Self {
            quota: Some(max_bytes),
            ..Self::new()
        }
    }

    /// Sets the label used in logs and metrics.
    pub fn label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = label.into();
        self
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes of keys and values currently stored.
    pub fn used_bytes(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.retain(|key, value| {
            self.release(entry_size(key, value));
            false
        });
        self.record();
    }

    fn release(&self, bytes: u64) {
        // The closure always returns `Some`, so the update cannot fail.
        let _ = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                Some(used.saturating_sub(bytes))
            });
    }

    fn record(&self) {
        record_capacity(&self.label, self.entries.len() as u64, self.used_bytes());
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.get(key).map(|value| value.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let added = entry_size(key, value);
        {
            // The shard lock held by `entry` serializes writers of this key,
            // so the replaced size stays counted in `used` until it is swapped.
            let slot = self.entries.entry(key.to_string());
            let replaced = match &slot {
                Entry::Occupied(old) => entry_size(key, old.get()),
                Entry::Vacant(_) => 0,
            };
            let quota = self.quota;
            let reserved = self
                .used
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                    let needed = used.saturating_sub(replaced).saturating_add(added);
                    quota.is_none_or(|limit| needed <= limit).then_some(needed)
                });
            if let Err(used) = reserved {
                let needed = used.saturating_sub(replaced).saturating_add(added);
                let limit = quota.unwrap_or(u64::MAX);
                tracing::debug!(backend = %self.label, key, needed, limit, "memory storage quota exceeded");
                return Err(StorageError::QuotaExceeded { needed, limit });
            }
            slot.insert(value.to_string());
        }
        self.record();
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        if let Entry::Occupied(slot) = self.entries.entry(key.to_string()) {
            self.release(entry_size(key, slot.get()));
            slot.remove();
        }
        self.record();
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}
