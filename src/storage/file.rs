use super::DocumentStore;
use crate::document::Document;
use crate::entity::{parse_entity_id, EntityId};
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const PLAIN_EXT: &str = ".json";
const GZIP_EXT: &str = ".json.gz";

/// One file per entity, named by the entity's canonical UUID.
///
/// Documents are JSON, optionally gzip-compressed (`<uuid>.json.gz`). Reads
/// fall back to the other encoding so toggling compression keeps old data
/// readable; the next write converts it.
pub struct FileStore {
    directory: PathBuf,
    compress: bool,
}

impl FileStore {
    /// Open a store rooted at `directory`, creating it if needed
    pub fn new(directory: &Path, compress: bool) -> Result<Self> {
        fs::create_dir_all(directory).with_context(|| {
            format!("Failed to create document directory {}", directory.display())
        })?;
        Ok(Self {
            directory: directory.to_path_buf(),
            compress,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path the next write for `id` goes to
    pub fn path_for(&self, id: &EntityId) -> PathBuf {
        self.path_with(id, self.compress)
    }

    fn path_with(&self, id: &EntityId, compressed: bool) -> PathBuf {
        let ext = if compressed { GZIP_EXT } else { PLAIN_EXT };
        self.directory.join(format!("{}{}", id, ext))
    }

    fn read_path(path: &Path) -> Result<Option<Document>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to open document {}", path.display()))
            }
        };

        let is_compressed = path.to_string_lossy().ends_with(GZIP_EXT);

        let mut json = String::new();
        if is_compressed {
            GzDecoder::new(file)
                .read_to_string(&mut json)
                .with_context(|| format!("Failed to decompress document {}", path.display()))?;
        } else {
            let mut file = file;
            file.read_to_string(&mut json)
                .with_context(|| format!("Failed to read document {}", path.display()))?;
        }

        let document = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse document {}", path.display()))?;
        Ok(Some(document))
    }
}

impl DocumentStore for FileStore {
    fn read(&self, id: &EntityId) -> Result<Option<Document>> {
        if let Some(doc) = Self::read_path(&self.path_with(id, self.compress))? {
            return Ok(Some(doc));
        }
        Self::read_path(&self.path_with(id, !self.compress))
    }

    /// Atomic write: tmp file, fsync, rename over the final path.
    fn write(&self, id: &EntityId, document: &Document) -> Result<()> {
        let json = serde_json::to_string_pretty(document)
            .context("Failed to serialize document to JSON")?;

        let path = self.path_for(id);
        let tmp_path = self.directory.join(format!("{}.tmp", id));

        {
            let tmp_file = File::create(&tmp_path)
                .with_context(|| format!("Failed to create {}", tmp_path.display()))?;

            let file = if self.compress {
                let mut encoder = GzEncoder::new(tmp_file, Compression::default());
                encoder
                    .write_all(json.as_bytes())
                    .context("Failed to write compressed document data")?;
                encoder.finish().context("Failed to finish compression")?
            } else {
                let mut file = tmp_file;
                file.write_all(json.as_bytes())
                    .context("Failed to write document data")?;
                file
            };

            file.sync_all()
                .context("Failed to sync document file to disk")?;
        }

        fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to rename {} into place", tmp_path.display()))?;

        // Drop the copy in the other encoding so it can never shadow this write
        let stale = self.path_with(id, !self.compress);
        match fs::remove_file(&stale) {
            Ok(()) => debug!(path = %stale.display(), "Removed stale document encoding"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to remove stale {}", stale.display()))
            }
        }

        Ok(())
    }

    fn list(&self) -> Result<Vec<EntityId>> {
        let entries = fs::read_dir(&self.directory)
            .with_context(|| format!("Failed to read {}", self.directory.display()))?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let stem = filename
                .strip_suffix(GZIP_EXT)
                .or_else(|| filename.strip_suffix(PLAIN_EXT));

            // Foreign files (config, tmp files, notes) are not documents
            if let Some(id) = stem.and_then(|s| parse_entity_id(s).ok()) {
                ids.push(id);
            }
        }

        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}
