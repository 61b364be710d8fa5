use crate::entity::{EntityContext, EntityId};
use crate::event::ListenerRegistry;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tracing::debug;


/// Host process view consumed by the lifecycle coordinator
pub trait Host: Send + Sync {
    /// Every entity the host has ever seen, for the startup cache load
    fn known_entities(&self) -> Vec<EntityId>;

    /// Contexts of the entities active right now
    fn active_entities(&self) -> Vec<Arc<EntityContext>>;
}

/// In-process host tracking active entity sessions.
///
/// Owns the listener registry and delivers activation/deactivation signals
/// for the sessions it tracks. Suitable for embedding and for tools that
/// only read stored data.
#[derive(Default)]
pub struct SessionHost {
    known: DashSet<EntityId>,
    active: DashMap<EntityId, Arc<EntityContext>>,
    listeners: ListenerRegistry,
}

impl SessionHost {
    pub fn new(known: impl IntoIterator<Item = EntityId>) -> Self {
        let host = Self::default();
        for id in known {
            host.known.insert(id);
        }
        host
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Track `ctx` as active without signalling listeners
    pub fn insert_active(&self, ctx: Arc<EntityContext>) {
        self.known.insert(ctx.id());
        self.active.insert(ctx.id(), ctx);
    }

    /// Start a session and signal activation
    pub fn activate(&self, ctx: Arc<EntityContext>) {
        debug!(entity_id = %ctx.id(), "Entity activated");
        self.insert_active(ctx.clone());
        self.listeners.activate(&ctx);
    }

    /// Signal deactivation, then end the session
    ///
    /// The entity is still listed as active while listeners run.
    pub fn deactivate(&self, id: &EntityId) -> Option<Arc<EntityContext>> {
        let ctx = self.active.get(id).map(|c| c.clone())?;
        self.listeners.deactivate(&ctx);
        self.active.remove(id);
        debug!(entity_id = %id, "Entity deactivated");
        Some(ctx)
    }

    pub fn context(&self, id: &EntityId) -> Option<Arc<EntityContext>> {
        self.active.get(id).map(|c| c.clone())
    }

    pub fn is_active(&self, id: &EntityId) -> bool {
        self.active.contains_key(id)
    }
}

impl Host for SessionHost {
    fn known_entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.known.iter().map(|id| *id).collect();
        ids.sort();
        ids
    }

    fn active_entities(&self) -> Vec<Arc<EntityContext>> {
        self.active.iter().map(|e| e.value().clone()).collect()
    }
}
