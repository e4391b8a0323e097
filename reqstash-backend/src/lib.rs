//! Storage backends for reqstash.
//!
//! | Backend | Durability | Use case |
//! |---------|------------|----------|
//! | [`MemoryStorage`] | process lifetime | tests, short-lived clients |
//! | [`FileStorage`] | survives restarts | the default durable store |
//! | [`ReadOnlyStorage`] | whatever it wraps | pre-seeded snapshots (rejected for caching) |
//!
//! All of them implement [`Storage`](reqstash_core::Storage). If you want to
//! implement your own store, that trait is all you need.
mod file;
mod memory;
pub mod metrics;
mod read_only;

pub use file::{FileStorage, FileStorageBuilder};
pub use memory::MemoryStorage;
pub use read_only::ReadOnlyStorage;
pub use reqstash_core::{Storage, StorageError, StorageOp, StorageResult};

/// Size a key-value pair counts against a quota.
pub(crate) fn entry_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}
