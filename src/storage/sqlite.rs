//! Document persistence using SQLite.
//!
//! One row per entity; the document body is stored as JSON text.

use super::DocumentStore;
use crate::document::Document;
use crate::entity::{parse_entity_id, EntityId};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

/// Persists entity documents in SQLite.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the SQLite database and ensures the table exists.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open document DB at {}", db_path))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_table()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Document DB connection lock poisoned"))
    }

    fn create_table(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS documents (
                entity_id  TEXT PRIMARY KEY,
                body       TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )
        .context("Failed to create documents table")?;
        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    fn read(&self, id: &EntityId) -> Result<Option<Document>> {
        let conn = self.conn()?;
        let body: Option<String> = conn
            .query_row(
                "SELECT body FROM documents WHERE entity_id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read document for {}", id))?;

        body.map(|body| {
            serde_json::from_str(&body)
                .with_context(|| format!("Failed to parse stored document for {}", id))
        })
        .transpose()
    }

    fn write(&self, id: &EntityId, document: &Document) -> Result<()> {
        let body =
            serde_json::to_string(document).context("Failed to serialize document to JSON")?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO documents (entity_id, body, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(entity_id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
            params![id.to_string(), body, Utc::now().to_rfc3339()],
        )
        .with_context(|| format!("Failed to write document for {}", id))?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<EntityId>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT entity_id FROM documents ORDER BY entity_id ASC")
            .context("Failed to prepare list query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("Failed to query documents")?;

        let mut ids = Vec::new();
        for row in rows {
            let raw = row.context("Failed to read document row")?;
            match parse_entity_id(&raw) {
                Ok(id) => ids.push(id),
                Err(e) => warn!(entity_id = %raw, error = %e, "Skipping row with invalid entity id"),
            }
        }
        Ok(ids)
    }
}
