// Entity documents and live working copies
pub mod document;

// Entity identifiers and host-owned entity contexts
pub mod entity;

// Lifecycle signals and priority-ordered listeners
pub mod event;

// Host process interface
pub mod host;

// Durable document storage backends
pub mod storage;

// Warm cache of last-saved documents
pub mod cache;

// Activation/deactivation/autosave coordination
pub mod lifecycle;

// TOML configuration
pub mod config;
