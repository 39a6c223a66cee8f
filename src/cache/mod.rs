//! Cache Module
//!
//! The expiring key-value store, named caches on top of it, and their
//! statistics.

mod entry;
mod handler;
mod named;
mod search;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{Entry, StoredValue};
pub use handler::{CacheHandler, SearchResults};
pub use named::NamedCache;
pub use search::{glob_match, path_exists, value_matches};
pub use stats::{CacheStats, StoreStats};
pub use store::{ExpiringStore, StoreGuard};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;
