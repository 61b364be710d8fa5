use super::{PersistConfig, StorageBackend};
use std::path::PathBuf;
use tracing::warn;

/// Apply `PERSIST_*` environment overrides on top of file/default config.
///
/// Unparseable values are logged and ignored.
pub fn apply_env_overrides(config: &mut PersistConfig) {
    apply_overrides(config, |name| std::env::var(name).ok());
}

fn apply_overrides(config: &mut PersistConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("PERSIST_AUTO_SAVE_INTERVAL") {
        match v.trim().parse::<u64>() {
            Ok(n) => config.playerdata.auto_save_interval = n,
            Err(e) => warn!(value = %v, error = %e, "Ignoring PERSIST_AUTO_SAVE_INTERVAL"),
        }
    }
    if let Some(v) = lookup("PERSIST_DATA_DIR") {
        if !v.trim().is_empty() {
            config.storage.directory = PathBuf::from(v);
        }
    }
    if let Some(v) = lookup("PERSIST_STORAGE_BACKEND") {
        match v.parse::<StorageBackend>() {
            Ok(backend) => config.storage.backend = backend,
            Err(e) => warn!(value = %v, error = %e, "Ignoring PERSIST_STORAGE_BACKEND"),
        }
    }
}
