//! Cache Statistics Module
//!
//! Tracks per-cache item counts, hits and misses, plus store-wide aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == Cache Stats ==
/// Counters for a single named cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Current number of items in the cache
    pub items: usize,
    /// Number of successful lookups
    pub hits: u64,
    /// Number of lookups for a missing key
    pub misses: u64,
    /// When the cache was created
    pub created_at: DateTime<Utc>,
    /// Last lookup, hit or miss
    #[serde(default)]
    pub last_accessed: Option<DateTime<Utc>>,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self {
            items: 0,
            hits: 0,
            misses: 0,
            created_at: Utc::now(),
            last_accessed: None,
        }
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    // == Record Hit ==
    pub fn record_hit(&mut self) {
        self.hits += 1;
        self.last_accessed = Some(Utc::now());
    }

    // == Record Miss ==
    pub fn record_miss(&mut self) {
        self.misses += 1;
        self.last_accessed = Some(Utc::now());
    }

    // == Update Item Count ==
    pub fn set_items(&mut self, count: usize) {
        self.items = count;
    }

    // == Reset ==
    /// Zeroes the access counters. The item count describes data, not
    /// traffic, and is kept.
    pub fn reset(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.last_accessed = None;
    }

    // == Import ==
    /// Takes over the traffic counters of an exported snapshot, keeping the
    /// live item count.
    pub fn absorb(&mut self, snapshot: &CacheStats) {
        self.hits = snapshot.hits;
        self.misses = snapshot.misses;
        self.created_at = snapshot.created_at;
        self.last_accessed = snapshot.last_accessed;
    }
}

// == Store Stats ==
/// Aggregate over every named cache of one store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreStats {
    /// Number of live named caches
    pub caches: usize,
    /// Sum of items across caches
    pub total_items: usize,
    /// Sum of cache hits
    pub total_hits: u64,
    /// Sum of cache misses, including lookups against missing caches
    pub total_misses: u64,
}

impl StoreStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_hits + self.total_misses;
        if total == 0 {
            0.0
        } else {
            self.total_hits as f64 / total as f64
        }
    }
}
