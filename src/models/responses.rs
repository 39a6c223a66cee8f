//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, StoreStats};
use crate::persistence::BackupInfo;

/// Response body for GET /get/:key and GET /caches/:name/items/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
    /// Remaining TTL in seconds, omitted when the key never expires
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl.map(|remaining| remaining.as_secs());
        self
    }
}

/// Response body for the SET operations
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for the DELETE operations on single keys
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    /// Creates a new DeleteResponse
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// Plain acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for GET /keys
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub keys: Vec<String>,
    pub count: usize,
}

impl KeysResponse {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for GET /caches
#[derive(Debug, Clone, Serialize)]
pub struct CacheListResponse {
    pub caches: Vec<String>,
    pub count: usize,
}

impl CacheListResponse {
    pub fn new(caches: Vec<String>) -> Self {
        Self {
            count: caches.len(),
            caches,
        }
    }
}

/// Response body for DELETE /clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Number of live entries removed
    pub cleared: usize,
}

/// Response body for GET /caches/:name/items
#[derive(Debug, Clone, Serialize)]
pub struct ItemsResponse {
    pub cache: String,
    pub items: HashMap<String, Value>,
    pub count: usize,
}

impl ItemsResponse {
    pub fn new(cache: impl Into<String>, items: HashMap<String, Value>) -> Self {
        Self {
            cache: cache.into(),
            count: items.len(),
            items,
        }
    }
}

/// One search hit
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub key: String,
    pub value: Value,
}

/// Response body for GET /caches/:name/search
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub cache: String,
    /// Matches sorted by key
    pub matches: Vec<SearchMatch>,
    pub count: usize,
}

impl SearchResponse {
    pub fn new(cache: impl Into<String>, matches: impl Iterator<Item = (String, Value)>) -> Self {
        let matches: Vec<SearchMatch> = matches
            .map(|(key, value)| SearchMatch { key, value })
            .collect();
        Self {
            cache: cache.into(),
            count: matches.len(),
            matches,
        }
    }
}

/// Response body for POST /caches/:name/find
#[derive(Debug, Clone, Serialize)]
pub struct FindResponse {
    pub cache: String,
    pub keys: Vec<String>,
    pub count: usize,
}

impl FindResponse {
    pub fn new(cache: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            cache: cache.into(),
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for GET /caches/:name/stats
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub cache: String,
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl CacheStatsResponse {
    pub fn new(cache: impl Into<String>, stats: CacheStats) -> Self {
        Self {
            cache: cache.into(),
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Name of the default store
    pub store: String,
    /// Live top-level entries, caches included
    pub entries: usize,
    #[serde(flatten)]
    pub totals: StoreStats,
    /// Hit rate (hits / (hits + misses)) across caches
    pub hit_rate: f64,
    /// Callbacks that failed since start-up
    pub callback_failures: u64,
}

impl StatsResponse {
    pub fn new(
        store: impl Into<String>,
        entries: usize,
        totals: StoreStats,
        callback_failures: u64,
    ) -> Self {
        Self {
            store: store.into(),
            entries,
            hit_rate: totals.hit_rate(),
            totals,
            callback_failures,
        }
    }
}

/// Response body for POST /caches/:name/backup
#[derive(Debug, Clone, Serialize)]
pub struct BackupResponse {
    pub cache: String,
    /// File written
    pub file: String,
}

/// Response body for POST /backups/restore
#[derive(Debug, Clone, Serialize)]
pub struct RestoreResponse {
    pub message: String,
    pub cache: String,
}

impl RestoreResponse {
    pub fn new(cache: impl Into<String>) -> Self {
        let cache = cache.into();
        Self {
            message: format!("Cache '{}' restored successfully", cache),
            cache,
        }
    }
}

/// Response body for GET /backups
#[derive(Debug, Clone, Serialize)]
pub struct BackupListResponse {
    /// Newest first
    pub backups: Vec<BackupInfo>,
    pub count: usize,
}

impl BackupListResponse {
    pub fn new(backups: Vec<BackupInfo>) -> Self {
        Self {
            count: backups.len(),
            backups,
        }
    }
}

/// Response body for DELETE /backups
#[derive(Debug, Clone, Serialize)]
pub struct CleanupResponse {
    /// Number of backup files deleted
    pub removed: usize,
}

/// Response body for the health check endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status ("healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
