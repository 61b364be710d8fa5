//! Durable per-entity document storage.
//!
//! A missing document is reported as `Ok(None)`, never as an error. Writes
//! replace the stored document wholesale.

use crate::config::{StorageBackend, StorageConfig};
use crate::document::Document;
use crate::entity::EntityId;
use anyhow::{Context, Result};
use std::sync::Arc;

mod file;
mod sqlite;

#[cfg(test)]
mod tests;

pub use file::FileStore;
pub use sqlite::SqliteStore;

/// Keyed durable storage for entity documents
pub trait DocumentStore: Send + Sync {
    /// Read the stored document, `None` if the entity has never been saved
    fn read(&self, id: &EntityId) -> Result<Option<Document>>;

    /// Replace the stored document for `id`
    fn write(&self, id: &EntityId, document: &Document) -> Result<()>;

    /// Every entity with a stored document
    fn list(&self) -> Result<Vec<EntityId>>;
}

/// Open the backend selected by configuration
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.backend {
        StorageBackend::File => Arc::new(FileStore::new(&config.directory, config.compress)?),
        StorageBackend::Sqlite => {
            let path = config.directory.join(&config.database);
            std::fs::create_dir_all(&config.directory).with_context(|| {
                format!("Failed to create data directory {}", config.directory.display())
            })?;
            Arc::new(SqliteStore::new(&path.to_string_lossy())?)
        }
    };
    Ok(store)
}
