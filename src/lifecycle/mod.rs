// Entity data lifecycle: attach on activation, save on deactivation/autosave/shutdown

mod autosave;
mod coordinator;

pub use autosave::AutoSaveManager;
pub use coordinator::{LifecycleError, PersistentData, SweepReport};
