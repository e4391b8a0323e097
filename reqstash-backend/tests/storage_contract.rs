//! Behaviour every store handed to the caching pipeline must share.

use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use reqstash_backend::{FileStorage, MemoryStorage, ReadOnlyStorage};
use reqstash_core::{Storage, StorageError, StorageOp, is_valid_storage};
use tempfile::TempDir;

fn assert_contract(storage: &dyn Storage) {
    assert!(is_valid_storage(Some(storage)), "{} rejected", storage.name());

    assert_eq!(storage.get("/postsGET").unwrap(), None);

    storage.set("/postsGET", r#"[{"id":1}]"#).unwrap();
    storage.set("/postsGET_cachettl", "1700000300000").unwrap();
    assert_eq!(
        storage.get("/postsGET").unwrap().as_deref(),
        Some(r#"[{"id":1}]"#)
    );

    storage.set("/postsGET", r#"[{"id":2}]"#).unwrap();
    assert_eq!(
        storage.get("/postsGET").unwrap().as_deref(),
        Some(r#"[{"id":2}]"#)
    );

    storage.remove("/postsGET").unwrap();
    storage.remove("/postsGET").unwrap();
    assert_eq!(storage.get("/postsGET").unwrap(), None);
    assert_eq!(
        storage.get("/postsGET_cachettl").unwrap().as_deref(),
        Some("1700000300000")
    );
}

fn assert_quota(storage: &dyn Storage) {
    storage.set("a", "1234").unwrap();
    let err = storage.set("b", "far too long for the store").unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { limit: 16, .. }));
    assert_eq!(storage.get("b").unwrap(), None);
    assert_eq!(storage.get("a").unwrap().as_deref(), Some("1234"));
}

#[test]
fn test_memory_storage_contract() {
    assert_contract(&MemoryStorage::new());
}

#[test]
fn test_file_storage_contract() {
    let dir = TempDir::new().unwrap();
    assert_contract(&FileStorage::open(dir.path()).unwrap());
}

#[test]
fn test_shared_storage_contract() {
    let shared: Arc<dyn Storage> = Arc::new(MemoryStorage::new().label("shared"));
    assert_contract(&shared);
    assert_eq!(shared.name(), "shared");

    let boxed: Box<dyn Storage> = Box::new(MemoryStorage::new());
    assert_contract(&boxed);
}

#[test]
fn test_memory_storage_quota() {
    assert_quota(&MemoryStorage::with_quota(16));
}

#[test]
fn test_file_storage_quota() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::builder()
        .path(dir.path())
        .max_bytes(16)
        .build()
        .unwrap();
    assert_quota(&storage);
}

#[test]
fn test_read_only_storage_is_not_usable() {
    let inner = MemoryStorage::new();
    inner.set("k", "v").unwrap();
    let view = ReadOnlyStorage::new(inner);

    assert!(!is_valid_storage(Some(&view)));
    assert!(view.supports(StorageOp::Get));
    assert!(!view.supports(StorageOp::Remove));
    assert_eq!(view.get("k").unwrap().as_deref(), Some("v"));
    assert_eq!(view.into_inner().len(), 1);
}

#[test]
fn test_memory_storage_accounting_under_contention() {
    const LIMIT: u64 = 30;
    let storage = MemoryStorage::with_quota(LIMIT);

    thread::scope(|scope| {
        for worker in 0..8 {
            let storage = &storage;
            scope.spawn(move || {
                for i in 0..5_000 {
                    let key = ["k", "posts", "feed"][(worker + i) % 3];
                    let value = if i % 2 == 0 { "a" } else { "abcdefgh" };
                    // Quota rejections are expected here; accounting must hold.
                    let _ = storage.set(key, value);
                    if i % 3 == 0 {
                        storage.remove(key).unwrap();
                    }
                    assert!(storage.used_bytes() <= LIMIT);
                }
            });
        }
    });

    let stored: u64 = ["k", "posts", "feed"]
        .iter()
        .filter_map(|key| {
            storage
                .get(key)
                .unwrap()
                .map(|value| (key.len() + value.len()) as u64)
        })
        .sum();
    assert_eq!(storage.used_bytes(), stored);

    storage.clear();
    assert_eq!(storage.used_bytes(), 0);
    assert!(storage.is_empty());
}
