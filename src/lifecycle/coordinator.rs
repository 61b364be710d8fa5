use crate::cache::WarmCache;
use crate::config::PlayerdataConfig;
use crate::document::WorkingCopy;
use crate::entity::{EntityContext, EntityId, PERSIST_KEY};
use crate::event::{LifecycleEvent, LifecycleListener, ListenerRegistry, Priority};
use crate::host::Host;
use crate::lifecycle::AutoSaveManager;
use anyhow::{Context, Result};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle rejections
#[derive(Debug, PartialEq)]
pub enum LifecycleError {
    /// Shutdown has begun; no new working copies are attached
    ShuttingDown,
}

impl std::fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleError::ShuttingDown => write!(f, "persistence is shutting down"),
        }
    }
}

impl std::error::Error for LifecycleError {}

/// Outcome of saving every active entity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entities whose working copy was written
    pub saved: usize,
    /// Entities without an attached working copy
    pub skipped: usize,
    /// Entities whose write failed
    pub failed: usize,
}

/// Coordinates entity documents between the host, the warm cache and storage.
///
/// Entities opt in by carrying the [`PERSIST_KEY`] marker on their context
/// before activation. Marked entities get a live [`WorkingCopy`] attached under
/// that key; its contents are written back on deactivation, on every autosave
/// tick and at shutdown.
pub struct PersistentData {
    host: Arc<dyn Host>,
    cache: Arc<WarmCache>,
    config: PlayerdataConfig,

    /// Serializes attach/save per entity
    entity_locks: DashMap<EntityId, Arc<Mutex<()>>>,

    shutting_down: AtomicBool,

    autosave: Mutex<Option<JoinHandle<()>>>,
}

impl PersistentData {
    /// Build the coordinator, subscribe it to `registry`, warm the cache and
    /// re-attach active entities.
    ///
    /// Subscribing happens first so no activation delivered during the
    /// startup load is missed. Performs blocking storage reads for every known
    /// entity; async callers should prefer [`PersistentData::start`].
    pub fn new(
        host: Arc<dyn Host>,
        cache: Arc<WarmCache>,
        config: PlayerdataConfig,
        registry: &ListenerRegistry,
    ) -> Arc<Self> {
        let data = Self::subscribed(host, cache, config, registry);
        data.warm_up();
        data
    }

    /// Like [`PersistentData::new`], with the startup load on the blocking
    /// pool, then start autosave if configured
    pub async fn start(
        host: Arc<dyn Host>,
        cache: Arc<WarmCache>,
        config: PlayerdataConfig,
        registry: &ListenerRegistry,
    ) -> Result<Arc<Self>> {
        let data = Self::subscribed(host, cache, config, registry);

        let loader = data.clone();
        tokio::task::spawn_blocking(move || loader.warm_up())
            .await
            .context("Startup load task failed")?;

        data.spawn_autosave();
        Ok(data)
    }

    /// Activation runs at `Lowest` so the working copy is attached before other
    /// listeners look for it; deactivation runs at `Monitor` so every other
    /// listener has finished writing before the save.
    fn subscribed(
        host: Arc<dyn Host>,
        cache: Arc<WarmCache>,
        config: PlayerdataConfig,
        registry: &ListenerRegistry,
    ) -> Arc<Self> {
        let data = Arc::new(Self {
            host,
            cache,
            config,
            entity_locks: DashMap::new(),
            shutting_down: AtomicBool::new(false),
            autosave: Mutex::new(None),
        });
        registry.register(LifecycleEvent::Activated, Priority::Lowest, data.clone());
        registry.register(LifecycleEvent::Deactivated, Priority::Monitor, data.clone());
        data
    }

    fn warm_up(&self) {
        let known = self.host.known_entities();
        self.cache.load_all(&known);

        // Entities already active when we come up (e.g. subsystem restart).
        // One activated concurrently may also be attached by its signal;
        // load_entity keeps whichever copy landed first.
        let active = self.host.active_entities();
        let mut attached = 0;
        for ctx in &active {
            match self.load_entity(ctx) {
                Ok(Some(_)) => attached += 1,
                Ok(None) => {}
                Err(e) => {
                    error!(entity_id = %ctx.id(), error = %e, "Failed to re-attach active entity");
                }
            }
        }

        info!(
            known = known.len(),
            active = active.len(),
            attached = attached,
            "Persistent data ready"
        );
    }

    pub fn config(&self) -> &PlayerdataConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<WarmCache> {
        &self.cache
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Attach the entity's working copy if its context is marked.
    ///
    /// Returns the attached copy, or `None` for unmarked entities. An entity
    /// that already has a working copy keeps it.
    pub fn load_entity(&self, ctx: &EntityContext) -> Result<Option<WorkingCopy>> {
        if !ctx.has_marker(PERSIST_KEY) {
            return Ok(None);
        }
        if self.is_shutting_down() {
            return Err(LifecycleError::ShuttingDown.into());
        }

        let id = ctx.id();
        let lock = self.lock_for(&id);
        let _guard = Self::acquire(&lock);

        if let Some(existing) = ctx.read_attached(PERSIST_KEY) {
            debug!(entity_id = %id, "Working copy already attached");
            return Ok(Some(existing));
        }

        let document = self
            .cache
            .get(&id)
            .with_context(|| format!("Failed to load document for {}", id))?;
        let copy = WorkingCopy::new(document);
        ctx.attach(PERSIST_KEY, copy.clone());

        debug!(entity_id = %id, keys = copy.read(|d| d.len()), "Attached working copy");
        Ok(Some(copy))
    }

    /// Save the entity's working copy if one is attached.
    ///
    /// Returns `false` for entities this system never attached. Storage errors
    /// are returned; the warm cache keeps its previous snapshot.
    pub fn save_entity(&self, ctx: &EntityContext) -> Result<bool> {
        if !ctx.has_marker(PERSIST_KEY) {
            return Ok(false);
        }
        let Some(copy) = ctx.read_attached(PERSIST_KEY) else {
            debug!(entity_id = %ctx.id(), "Marked but no working copy attached, nothing to save");
            return Ok(false);
        };

        let id = ctx.id();
        let lock = self.lock_for(&id);
        let _guard = Self::acquire(&lock);

        let document = copy.snapshot();
        self.cache
            .save(&id, &document)
            .with_context(|| format!("Failed to save document for {}", id))?;

        debug!(entity_id = %id, keys = document.len(), "Saved working copy");
        Ok(true)
    }

    /// Save every active entity, isolating per-entity failures
    pub fn save_active(&self) -> SweepReport {
        let mut report = SweepReport::default();
        for ctx in self.host.active_entities() {
            match self.save_entity(&ctx) {
                Ok(true) => report.saved += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    error!(entity_id = %ctx.id(), error = %e, "Failed to save entity");
                }
            }
        }
        report
    }

    /// Point-in-time copy of an entity's stored data.
    ///
    /// Reads the warm cache, falling back to storage without caching the
    /// result. For an active entity this can lag behind the live working copy;
    /// read the copy attached under [`PERSIST_KEY`] instead.
    pub fn get_player_data(&self, id: &EntityId) -> Result<HashMap<String, Value>> {
        Ok(self.cache.get(id)?.into_map())
    }

    /// Start the autosave task when a positive interval is configured.
    ///
    /// Must be called from within a tokio runtime. Returns whether a task is
    /// running afterwards.
    pub fn spawn_autosave(self: &Arc<Self>) -> bool {
        if self.is_shutting_down() {
            return false;
        }

        let mut slot = self.autosave.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            return true;
        }

        let manager = AutoSaveManager::new(Arc::downgrade(self), &self.config);
        if !manager.is_enabled() {
            info!("Autosave disabled");
            return false;
        }

        *slot = Some(tokio::spawn(async move { manager.run_autosave_loop().await }));
        true
    }

    /// Stop autosave and save every active entity.
    ///
    /// Blocks until all saves finish. Activations are rejected from here on.
    pub fn shutdown(&self) -> SweepReport {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            warn!("Shutdown already in progress");
        }

        if let Some(handle) = self
            .autosave
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }

        let report = self.save_active();
        info!(
            saved = report.saved,
            skipped = report.skipped,
            failed = report.failed,
            "Persistent data shut down"
        );
        report
    }

    /// Entities currently holding a per-entity lock
    pub(crate) fn tracked_entities(&self) -> usize {
        self.entity_locks.len()
    }

    fn lock_for(&self, id: &EntityId) -> Arc<Mutex<()>> {
        self.entity_locks.entry(*id).or_default().clone()
    }

    fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
        lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl LifecycleListener for PersistentData {
    fn on_activate(&self, ctx: &EntityContext) -> Result<()> {
        self.load_entity(ctx).map(|_| ())
    }

    fn on_deactivate(&self, ctx: &EntityContext) -> Result<()> {
        let saved = self.save_entity(ctx);
        // The session is over; the next activation starts a fresh lock
        self.entity_locks.remove(&ctx.id());
        saved.map(|_| ())
    }
}
