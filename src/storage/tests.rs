use super::*;
use crate::config::StorageConfig;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use uuid::Uuid;

fn sample_document() -> Document {
    let mut doc = Document::new();
    doc.set("rank", json!("gold"));
    doc.set("coins", json!(10));
    doc.set("homes", json!({"base": {"x": 12, "y": 64, "z": -3}}));
    doc.set("titles", json!(["founder", "builder"]));
    doc
}

fn in_memory_store() -> SqliteStore {
    SqliteStore::new(":memory:").expect("in-memory store failed")
}

#[test]
fn test_file_store_missing_document_is_none() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path(), false).unwrap();

    assert!(store.read(&Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn test_file_store_write_and_read() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path(), false).unwrap();
    let id = Uuid::new_v4();

    store.write(&id, &sample_document()).unwrap();

    assert!(temp_dir.path().join(format!("{}.json", id)).exists());
    assert_eq!(store.read(&id).unwrap(), Some(sample_document()));
}

#[test]
fn test_file_store_write_replaces_not_merges() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path(), false).unwrap();
    let id = Uuid::new_v4();

    store.write(&id, &sample_document()).unwrap();

    let mut smaller = Document::new();
    smaller.set("coins", json!(3));
    store.write(&id, &smaller).unwrap();

    let loaded = store.read(&id).unwrap().unwrap();
    assert_eq!(loaded, smaller);
    assert!(!loaded.contains_key("rank"));
}

#[test]
fn test_file_store_leaves_no_tmp_file() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path(), false).unwrap();
    let id = Uuid::new_v4();

    store.write(&id, &sample_document()).unwrap();

    assert!(!temp_dir.path().join(format!("{}.tmp", id)).exists());
}

#[test]
fn test_file_store_compressed_write_and_read() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path(), true).unwrap();
    let id = Uuid::new_v4();

    store.write(&id, &sample_document()).unwrap();

    let path = store.path_for(&id);
    assert!(path.to_string_lossy().ends_with(".json.gz"));
    // Not plain JSON on disk
    assert!(serde_json::from_slice::<serde_json::Value>(&fs::read(&path).unwrap()).is_err());
    assert_eq!(store.read(&id).unwrap(), Some(sample_document()));
}

#[test]
fn test_file_store_reads_other_encoding_after_toggle() {
    let temp_dir = TempDir::new().unwrap();
    let id = Uuid::new_v4();

    FileStore::new(temp_dir.path(), false)
        .unwrap()
        .write(&id, &sample_document())
        .unwrap();

    let compressed = FileStore::new(temp_dir.path(), true).unwrap();
    assert_eq!(compressed.read(&id).unwrap(), Some(sample_document()));

    // Next write converts the document and removes the plain copy
    compressed.write(&id, &Document::new()).unwrap();
    assert!(!temp_dir.path().join(format!("{}.json", id)).exists());
    assert_eq!(compressed.read(&id).unwrap(), Some(Document::new()));
}

#[test]
fn test_file_store_corrupt_document_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path(), false).unwrap();
    let id = Uuid::new_v4();

    fs::write(store.path_for(&id), b"{ not json").unwrap();

    assert!(store.read(&id).is_err());
}

#[test]
fn test_file_store_list_ignores_foreign_files() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileStore::new(temp_dir.path(), false).unwrap();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    store.write(&a, &sample_document()).unwrap();
    store.write(&b, &Document::new()).unwrap();

    fs::write(temp_dir.path().join("config.toml"), "").unwrap();
    fs::write(temp_dir.path().join("notes.json"), "{}").unwrap();
    fs::write(temp_dir.path().join(format!("{}.tmp", Uuid::new_v4())), "{}").unwrap();
    fs::create_dir(temp_dir.path().join(format!("{}.json", Uuid::new_v4()))).unwrap();

    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(store.list().unwrap(), expected);
}

#[test]
fn test_sqlite_store_missing_document_is_none() {
    let store = in_memory_store();
    assert!(store.read(&Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn test_sqlite_store_write_and_read() {
    let store = in_memory_store();
    let id = Uuid::new_v4();

    store.write(&id, &sample_document()).unwrap();

    assert_eq!(store.read(&id).unwrap(), Some(sample_document()));
}

#[test]
fn test_sqlite_store_write_replaces_existing_row() {
    let store = in_memory_store();
    let id = Uuid::new_v4();

    store.write(&id, &sample_document()).unwrap();
    store.write(&id, &Document::new()).unwrap();

    assert_eq!(store.read(&id).unwrap(), Some(Document::new()));
    assert_eq!(store.list().unwrap(), vec![id]);
}

#[test]
fn test_sqlite_store_list_sorted() {
    let store = in_memory_store();
    let mut ids: Vec<EntityId> = (0..3).map(|_| Uuid::new_v4()).collect();
    for id in &ids {
        store.write(id, &Document::new()).unwrap();
    }

    ids.sort();
    assert_eq!(store.list().unwrap(), ids);
}

#[test]
fn test_open_store_sqlite_backend_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let config = StorageConfig {
        backend: StorageBackend::Sqlite,
        directory: temp_dir.path().join("data"),
        compress: false,
        database: "persist.db".into(),
    };
    let id = Uuid::new_v4();

    open_store(&config)
        .unwrap()
        .write(&id, &sample_document())
        .unwrap();

    let reopened = open_store(&config).unwrap();
    assert_eq!(reopened.read(&id).unwrap(), Some(sample_document()));
    assert!(temp_dir.path().join("data").join("persist.db").exists());
}

#[test]
fn test_open_store_file_backend_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let config = StorageConfig {
        backend: StorageBackend::File,
        directory: temp_dir.path().join("nested").join("players"),
        compress: false,
        database: "persist.db".into(),
    };

    let store = open_store(&config).unwrap();

    assert!(config.directory.is_dir());
    assert!(store.list().unwrap().is_empty());
}
