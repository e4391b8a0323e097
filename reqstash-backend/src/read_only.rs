use reqstash_core::{Storage, StorageError, StorageOp, StorageResult};

/// Read-only view over another store.
///
/// Useful for inspecting a store without risking writes. It only supports
/// [`StorageOp::Get`], so the caching pipeline rejects it and requests
/// configured with it simply go to the network.
#[derive(Debug, Clone)]
pub struct ReadOnlyStorage<S> {
    inner: S,
}

impl<S: Storage> ReadOnlyStorage<S> {
    /// Wraps `inner`.
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Returns the wrapped store.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Storage> Storage for ReadOnlyStorage<S> {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        Err(StorageError::Unsupported(StorageOp::Set))
    }

    fn remove(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::Unsupported(StorageOp::Remove))
    }

    fn supports(&self, op: StorageOp) -> bool {
        op == StorageOp::Get
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use reqstash_core::is_valid_storage;

    use super::*;
    use crate::MemoryStorage;

    #[test]
    fn test_reads_through_and_refuses_writes() {
        let inner = MemoryStorage::new();
        inner.set("k", "v").unwrap();
        let view = ReadOnlyStorage::new(inner.clone());

        assert_eq!(view.get("k").unwrap().as_deref(), Some("v"));
        assert!(matches!(
            view.set("k", "w"),
            Err(StorageError::Unsupported(StorageOp::Set))
        ));
        assert!(view.remove("k").is_err());
        assert_eq!(inner.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_rejected_by_validator() {
        let view = ReadOnlyStorage::new(MemoryStorage::new());
        assert!(!is_valid_storage(Some(&view)));
    }
}
