use anyhow::{bail, Context, Result};
use persist::cache::WarmCache;
use persist::config::{apply_env_overrides, load_config, PersistConfig};
use persist::entity::parse_entity_id;
use persist::host::SessionHost;
use persist::lifecycle::PersistentData;
use persist::storage::{open_store, DocumentStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

const USAGE: &str = "usage: persist [--config FILE] <list | show <entity-uuid>>";

enum Command {
    List,
    Show(String),
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<(Option<PathBuf>, Command)> {
    let mut config_path = None;
    let mut rest = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            let path = args.next().context("--config requires a path")?;
            config_path = Some(PathBuf::from(path));
        } else {
            rest.push(arg);
        }
    }

    let command = match rest.as_slice() {
        [cmd] if cmd == "list" => Command::List,
        [cmd, id] if cmd == "show" => Command::Show(id.clone()),
        _ => bail!(USAGE),
    };
    Ok((config_path, command))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "persist=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let (config_path, command) = parse_args(std::env::args().skip(1))?;

    let mut config = match config_path {
        Some(path) => load_config(&path)?,
        None => PersistConfig::default(),
    };
    apply_env_overrides(&mut config);

    info!(
        backend = ?config.storage.backend,
        directory = %config.storage.directory.display(),
        "Opening document store"
    );
    let store = open_store(&config.storage)?;
    let known = store.list()?;

    match command {
        Command::List => {
            for id in known {
                println!("{}", id);
            }
        }
        Command::Show(raw) => {
            let id = parse_entity_id(&raw)?;
            // Read-only session: nothing is active, so nothing gets saved
            let host = Arc::new(SessionHost::new(known));
            let cache = Arc::new(WarmCache::new(store));
            let data = PersistentData::start(
                host.clone(),
                cache,
                config.playerdata.clone(),
                host.listeners(),
            )
            .await?;

            let snapshot = data.get_player_data(&id)?;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            data.shutdown();
        }
    }

    Ok(())
}
