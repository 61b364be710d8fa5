pub mod env;
pub use env::apply_env_overrides;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete Persist configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistConfig {
    #[serde(default)]
    pub playerdata: PlayerdataConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Entity data lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerdataConfig {
    /// Ticks between automatic saves of active entities. 0 disables autosave.
    #[serde(default)]
    pub auto_save_interval: u64,
    /// Length of one tick (milliseconds)
    #[serde(default = "default_tick_millis")]
    pub tick_millis: u64,
}

fn default_tick_millis() -> u64 {
    50
}

impl Default for PlayerdataConfig {
    fn default() -> Self {
        Self {
            auto_save_interval: 0,
            tick_millis: default_tick_millis(),
        }
    }
}

impl PlayerdataConfig {
    /// Wall-clock autosave period, `None` when autosave is disabled
    pub fn auto_save_period(&self) -> Option<Duration> {
        if self.auto_save_interval < 1 {
            return None;
        }
        let millis = self
            .auto_save_interval
            .saturating_mul(self.tick_millis.max(1));
        Some(Duration::from_millis(millis))
    }
}

/// Which durable store backs entity documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One document file per entity
    #[default]
    File,
    /// Single SQLite database
    Sqlite,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Data directory (document files, or the SQLite database)
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    /// Gzip document files
    #[serde(default)]
    pub compress: bool,
    /// SQLite database file, relative to `directory`
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_directory() -> PathBuf {
    PathBuf::from("plugins/Persist")
}

fn default_database() -> PathBuf {
    PathBuf::from("persist.db")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            directory: default_directory(),
            compress: false,
            database: default_database(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &Path) -> Result<PersistConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: PersistConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}
