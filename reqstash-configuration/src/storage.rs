use std::path::PathBuf;
use std::sync::Arc;

use bytesize::ByteSize;
use reqstash_backend::{FileStorage, MemoryStorage};
use reqstash_core::Storage;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// In-memory store settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Memory {
    /// Quota over keys and values, e.g. `5 MiB`.
    #[serde(default)]
    pub max_bytes: Option<ByteSize>,
    /// Optional label for this store (used in metrics/tracing).
    #[serde(default)]
    pub label: Option<String>,
}

/// File store settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct File {
    /// Backing file, or a directory to create `reqstash.json` in.
    pub path: PathBuf,
    /// Quota over keys and values, e.g. `5 MiB`.
    #[serde(default)]
    pub max_bytes: Option<ByteSize>,
    /// Optional label for this store (used in metrics/tracing).
    #[serde(default)]
    pub label: Option<String>,
}

/// Default durable store of the cache.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum StorageConfig {
    /// [`MemoryStorage`].
    Memory(Memory),
    /// [`FileStorage`].
    File(File),
}

impl StorageConfig {
    /// Opens the configured store.
    pub fn into_storage(self) -> Result<Arc<dyn Storage>, ConfigError> {
        match self {
            StorageConfig::Memory(config) => {
                let mut storage = match config.max_bytes {
                    Some(limit) => MemoryStorage::with_quota(limit.as_u64()),
                    None => MemoryStorage::new(),
                };
                if let Some(label) = config.label {
                    storage = storage.label(label);
                }
                Ok(Arc::new(storage))
            }
            StorageConfig::File(config) => {
                let mut builder = FileStorage::builder().path(&config.path);
                if let Some(limit) = config.max_bytes {
                    builder = builder.max_bytes(limit.as_u64());
                }
                if let Some(label) = config.label {
                    builder = builder.label(label);
                }
                Ok(Arc::new(builder.build()?))
            }
        }
    }
}
