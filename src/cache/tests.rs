use super::*;
use crate::storage::FileStore;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use uuid::Uuid;

fn file_cache(temp_dir: &TempDir) -> (Arc<FileStore>, WarmCache) {
    let store = Arc::new(FileStore::new(temp_dir.path(), false).unwrap());
    let cache = WarmCache::new(store.clone());
    (store, cache)
}

fn doc(pairs: &[(&str, serde_json::Value)]) -> Document {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn test_load_all_caches_stored_and_missing_documents() {
    let temp_dir = TempDir::new().unwrap();
    let (store, cache) = file_cache(&temp_dir);
    let known = Uuid::new_v4();
    let never_saved = Uuid::new_v4();

    store.write(&known, &doc(&[("rank", json!("gold"))])).unwrap();

    assert_eq!(cache.load_all(&[known, never_saved]), 2);

    assert_eq!(cache.cached(&known), Some(doc(&[("rank", json!("gold"))])));
    assert_eq!(cache.cached(&never_saved), Some(Document::new()));
}

#[test]
fn test_load_all_skips_unreadable_document() {
    let temp_dir = TempDir::new().unwrap();
    let (store, cache) = file_cache(&temp_dir);
    let good = Uuid::new_v4();
    let corrupt = Uuid::new_v4();

    store.write(&good, &doc(&[("x", json!(1))])).unwrap();
    fs::write(store.path_for(&corrupt), b"{{{").unwrap();

    assert_eq!(cache.load_all(&[corrupt, good]), 1);
    assert!(cache.contains(&good));
    assert!(!cache.contains(&corrupt));
}

#[test]
fn test_get_prefers_cached_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let (store, cache) = file_cache(&temp_dir);
    let id = Uuid::new_v4();

    store.write(&id, &doc(&[("coins", json!(1))])).unwrap();
    cache.load_all(&[id]);

    // Storage changes behind the cache's back are not observed
    store.write(&id, &doc(&[("coins", json!(99))])).unwrap();

    assert_eq!(cache.get(&id).unwrap(), doc(&[("coins", json!(1))]));
}

#[test]
fn test_get_miss_reads_storage_without_caching() {
    let temp_dir = TempDir::new().unwrap();
    let (store, cache) = file_cache(&temp_dir);
    let id = Uuid::new_v4();

    store.write(&id, &doc(&[("coins", json!(5))])).unwrap();

    assert_eq!(cache.get(&id).unwrap(), doc(&[("coins", json!(5))]));
    assert!(!cache.contains(&id));
    assert!(cache.is_empty());
}

#[test]
fn test_get_missing_everywhere_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let (_store, cache) = file_cache(&temp_dir);

    assert_eq!(cache.get(&Uuid::new_v4()).unwrap(), Document::new());
}

#[test]
fn test_get_corrupt_document_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let (store, cache) = file_cache(&temp_dir);
    let id = Uuid::new_v4();

    fs::write(store.path_for(&id), b"not json").unwrap();

    assert!(cache.get(&id).is_err());
}

#[test]
fn test_save_writes_storage_and_refreshes_cache() {
    let temp_dir = TempDir::new().unwrap();
    let (store, cache) = file_cache(&temp_dir);
    let id = Uuid::new_v4();
    let saved = doc(&[("coins", json!(10))]);

    cache.save(&id, &saved).unwrap();

    assert_eq!(store.read(&id).unwrap(), Some(saved.clone()));
    assert_eq!(cache.cached(&id), Some(saved));
}

#[test]
fn test_save_twice_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let (store, cache) = file_cache(&temp_dir);
    let id = Uuid::new_v4();
    let saved = doc(&[("x", json!([1, 2, 3]))]);

    cache.save(&id, &saved).unwrap();
    let first = fs::read(store.path_for(&id)).unwrap();
    cache.save(&id, &saved).unwrap();
    let second = fs::read(store.path_for(&id)).unwrap();

    assert_eq!(
        serde_json::from_slice::<Document>(&first).unwrap(),
        serde_json::from_slice::<Document>(&second).unwrap()
    );
    assert_eq!(store.list().unwrap(), vec![id]);
}

#[test]
fn test_failed_save_keeps_previous_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("data");
    let store = Arc::new(FileStore::new(&data_dir, false).unwrap());
    let cache = WarmCache::new(store);
    let id = Uuid::new_v4();

    cache.save(&id, &doc(&[("coins", json!(1))])).unwrap();

    // Removing the directory makes the tmp-file create fail
    fs::remove_dir_all(&data_dir).unwrap();

    assert!(cache.save(&id, &doc(&[("coins", json!(2))])).is_err());
    assert_eq!(cache.cached(&id), Some(doc(&[("coins", json!(1))])));
}
