//! Key-value storage contract and validation.
//!
//! The pipeline persists two plain string entries per cached request and
//! needs nothing more from a store than three operations:
//!
//! - [`Storage::get`] - read a value by key
//! - [`Storage::set`] - write a value by key
//! - [`Storage::remove`] - delete a value by key
//!
//! Callers may hand the pipeline an arbitrary store in place of the default
//! one, so every access is preceded by [`is_valid_storage`]. A store that
//! reports it cannot perform one of the operations (for example a read-only
//! snapshot) is rejected and caching is disabled for that request.
//!
//! ```
//! use reqstash_core::{Storage, StorageOp, StorageResult, is_valid_storage};
//!
//! struct Snapshot;
//!
//! impl Storage for Snapshot {
//!     fn get(&self, _key: &str) -> StorageResult<Option<String>> {
//!         Ok(None)
//!     }
//!     fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
//!         Ok(())
//!     }
//!     fn remove(&self, _key: &str) -> StorageResult<()> {
//!         Ok(())
//!     }
//!     fn supports(&self, op: StorageOp) -> bool {
//!         op == StorageOp::Get
//!     }
//! }
//!
//! assert!(!is_valid_storage(Some(&Snapshot)));
//! assert!(!is_valid_storage(None));
//! ```

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// One of the three operations a store must provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    /// Read a value.
    Get,
    /// Write a value.
    Set,
    /// Delete a value.
    Remove,
}

impl StorageOp {
    /// Every operation the pipeline relies on.
    pub const REQUIRED: [StorageOp; 3] = [StorageOp::Get, StorageOp::Set, StorageOp::Remove];

    /// Returns the operation name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StorageOp::Get => "get",
            StorageOp::Set => "set",
            StorageOp::Remove => "remove",
        }
    }
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by storage implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The write would exceed the store's capacity.
    #[error("storage quota exceeded: {needed} bytes needed, limit is {limit} bytes")]
    QuotaExceeded {
        /// Total size the store would reach after the write.
        needed: u64,
        /// Configured capacity.
        limit: u64,
    },
    /// The store does not implement the operation.
    #[error("storage does not support `{0}`")]
    Unsupported(StorageOp),
    /// An I/O error while accessing durable state.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Persisted state could not be (de)serialized.
    #[error("storage format error: {0}")]
    Format(#[from] serde_json::Error),
    /// Any other backend failure.
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Minimal string key-value store.
pub trait Storage: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Deletes `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Whether the store implements `op`.
    ///
    /// Stores implement all three operations unless they say otherwise.
    fn supports(&self, op: StorageOp) -> bool {
        let _ = op;
        true
    }

    /// Name used in log records.
    fn name(&self) -> &str {
        "storage"
    }
}

/// Returns `true` iff `candidate` is present and supports get, set and remove.
///
/// Never panics; an absent store (no default configured) is simply invalid.
pub fn is_valid_storage(candidate: Option<&dyn Storage>) -> bool {
    match candidate {
        Some(storage) => StorageOp::REQUIRED.iter().all(|op| storage.supports(*op)),
        None => false,
    }
}

impl<S: Storage + ?Sized> Storage for &S {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn supports(&self, op: StorageOp) -> bool {
        (**self).supports(op)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn supports(&self, op: StorageOp) -> bool {
        (**self).supports(op)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<S: Storage + ?Sized> Storage for Arc<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        (**self).remove(key)
    }

    fn supports(&self, op: StorageOp) -> bool {
        (**self).supports(op)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Partial(&'static [StorageOp]);

    impl Storage for Partial {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Unsupported(StorageOp::Set))
        }

        fn remove(&self, _key: &str) -> StorageResult<()> {
            Err(StorageError::Unsupported(StorageOp::Remove))
        }

        fn supports(&self, op: StorageOp) -> bool {
            self.0.contains(&op)
        }
    }

    #[test]
    fn test_full_store_is_valid() {
        let store = Partial(&StorageOp::REQUIRED);
        assert!(is_valid_storage(Some(&store)));
    }

    #[test]
    fn test_missing_remove_is_rejected() {
        let store = Partial(&[StorageOp::Get, StorageOp::Set]);
        assert!(!is_valid_storage(Some(&store)));
    }

    #[test]
    fn test_absent_store_is_rejected() {
        assert!(!is_valid_storage(None));
    }

    #[test]
    fn test_wrappers_forward_capabilities() {
        let store: Arc<dyn Storage> = Arc::new(Partial(&[StorageOp::Get]));
        assert!(!is_valid_storage(Some(&store)));
        let boxed: Box<dyn Storage> = Box::new(Partial(&StorageOp::REQUIRED));
        assert!(is_valid_storage(Some(&boxed)));
    }

    #[test]
    fn test_quota_error_message() {
        let err = StorageError::QuotaExceeded {
            needed: 12,
            limit: 10,
        };
        assert_eq!(
            err.to_string(),
            "storage quota exceeded: 12 bytes needed, limit is 10 bytes"
        );
    }
}
