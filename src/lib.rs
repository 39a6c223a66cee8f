//! Radish - An in-memory TTL key-value store with named caches
//!
//! Provides an expiring store, named sub-caches with statistics and search,
//! a synchronous event bus, JSON backups and an HTTP interface.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod persistence;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheHandler, ExpiringStore};
pub use config::{Config, StoreConfig};
pub use error::{CacheError, Result};
pub use events::{EventBus, EventContext, EventKind};
pub use persistence::BackupManager;
pub use tasks::{spawn_backup_task, spawn_sweep_task, TaskHandle};
