use crate::entity::EntityContext;
use anyhow::Result;
use std::sync::{Arc, RwLock};
use tracing::error;


/// Handler ordering for lifecycle signals.
///
/// Listeners run from `Lowest` to `Monitor`. A low priority handler runs first
/// so later handlers observe its effects; `Monitor` runs last, after every
/// other handler has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Lowest,
    Low,
    Normal,
    High,
    Highest,
    Monitor,
}

/// Lifecycle signal delivered by the host
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    Activated,
    Deactivated,
}

/// Receives entity activation/deactivation signals from the host
pub trait LifecycleListener: Send + Sync {
    fn on_activate(&self, ctx: &EntityContext) -> Result<()>;

    fn on_deactivate(&self, ctx: &EntityContext) -> Result<()>;
}

struct Registration {
    event: LifecycleEvent,
    priority: Priority,
    listener: Arc<dyn LifecycleListener>,
}

/// Host-side registry dispatching lifecycle signals in priority order
///
/// A failing listener is logged and does not stop delivery to the rest.
#[derive(Default)]
pub struct ListenerRegistry {
    registrations: RwLock<Vec<Registration>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for one event at the given priority.
    ///
    /// Listeners sharing a priority run in registration order.
    pub fn register(
        &self,
        event: LifecycleEvent,
        priority: Priority,
        listener: Arc<dyn LifecycleListener>,
    ) {
        let mut regs = self.registrations.write().unwrap_or_else(|e| e.into_inner());
        regs.push(Registration {
            event,
            priority,
            listener,
        });
        // Stable sort keeps registration order within a priority
        regs.sort_by_key(|r| r.priority);
    }

    pub fn listener_count(&self, event: LifecycleEvent) -> usize {
        self.registrations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.event == event)
            .count()
    }

    pub fn activate(&self, ctx: &EntityContext) {
        self.dispatch(LifecycleEvent::Activated, ctx);
    }

    pub fn deactivate(&self, ctx: &EntityContext) {
        self.dispatch(LifecycleEvent::Deactivated, ctx);
    }

    fn dispatch(&self, event: LifecycleEvent, ctx: &EntityContext) {
        // Snapshot the listeners so handlers may register without deadlocking
        let listeners: Vec<(Priority, Arc<dyn LifecycleListener>)> = self
            .registrations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.event == event)
            .map(|r| (r.priority, r.listener.clone()))
            .collect();

        for (priority, listener) in listeners {
            let result = match event {
                LifecycleEvent::Activated => listener.on_activate(ctx),
                LifecycleEvent::Deactivated => listener.on_deactivate(ctx),
            };
            if let Err(e) = result {
                error!(
                    entity_id = %ctx.id(),
                    event = ?event,
                    priority = ?priority,
                    error = %e,
                    "Lifecycle listener failed"
                );
            }
        }
    }
}
