use crate::document::Document;
use crate::entity::EntityId;
use crate::storage::DocumentStore;
use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

#[cfg(test)]
mod tests;

/// Last-known-good document per entity, backed by durable storage.
///
/// Entries come only from the startup load and from saves. A cache miss in
/// `get` reads storage but leaves the cache untouched, so transient reads of
/// entities that never activate don't accumulate in memory.
pub struct WarmCache {
    store: Arc<dyn DocumentStore>,

    /// Concurrent map; the autosave sweep and deactivation saves write it
    entries: DashMap<EntityId, Document>,
}

impl WarmCache {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            entries: DashMap::new(),
        }
    }

    /// Load every listed entity from storage into the cache.
    ///
    /// Entities without a stored document are cached as empty. A document that
    /// fails to read is logged and left uncached; the next `get` retries it.
    /// Returns the number of entities cached.
    pub fn load_all(&self, ids: &[EntityId]) -> usize {
        let mut loaded = 0;
        for id in ids {
            match self.store.read(id) {
                Ok(doc) => {
                    self.entries.insert(*id, doc.unwrap_or_default());
                    loaded += 1;
                }
                Err(e) => {
                    error!(entity_id = %id, error = %e, "Failed to load entity document");
                }
            }
        }

        info!(
            requested = ids.len(),
            loaded = loaded,
            "Warm cache loaded"
        );
        loaded
    }

    /// Cached document, or a fresh storage read on a miss (not cached)
    pub fn get(&self, id: &EntityId) -> Result<Document> {
        if let Some(doc) = self.entries.get(id) {
            return Ok(doc.clone());
        }

        debug!(entity_id = %id, "Warm cache miss, reading storage");
        Ok(self.store.read(id)?.unwrap_or_default())
    }

    /// Cached document without falling back to storage
    pub fn cached(&self, id: &EntityId) -> Option<Document> {
        self.entries.get(id).map(|doc| doc.clone())
    }

    /// Write `document` to storage, then refresh the cache entry.
    ///
    /// On a storage error the cache keeps its previous snapshot.
    pub fn save(&self, id: &EntityId, document: &Document) -> Result<()> {
        self.store.write(id, document)?;
        self.entries.insert(*id, document.clone());
        Ok(())
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
