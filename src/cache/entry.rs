//! Cache Entry Module
//!
//! Defines the structure for individual store entries with TTL support.

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::cache::NamedCache;

// == Stored Value ==
/// What a top-level store entry holds.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// A plain JSON value
    Value(Value),
    /// A named cache container
    Cache(NamedCache),
}

impl StoredValue {
    /// Renders the entry as JSON; a cache becomes an object of its items.
    pub fn to_json(&self) -> Value {
        match self {
            StoredValue::Value(value) => value.clone(),
            StoredValue::Cache(cache) => cache.to_json(),
        }
    }

    pub fn is_cache(&self) -> bool {
        matches!(self, StoredValue::Cache(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            StoredValue::Value(value) => Some(value),
            StoredValue::Cache(_) => None,
        }
    }

    pub fn as_cache(&self) -> Option<&NamedCache> {
        match self {
            StoredValue::Cache(cache) => Some(cache),
            StoredValue::Value(_) => None,
        }
    }

    pub fn as_cache_mut(&mut self) -> Option<&mut NamedCache> {
        match self {
            StoredValue::Cache(cache) => Some(cache),
            StoredValue::Value(_) => None,
        }
    }
}

impl From<Value> for StoredValue {
    fn from(value: Value) -> Self {
        StoredValue::Value(value)
    }
}

impl From<NamedCache> for StoredValue {
    fn from(cache: NamedCache) -> Self {
        StoredValue::Cache(cache)
    }
}

// == Entry ==
/// A stored value with its absolute deadline.
///
/// Deadlines are taken from the monotonic clock once, at insertion, so wall
/// clock adjustments never move them.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored value
    pub value: StoredValue,
    /// Expiration deadline, None = no expiration
    pub expires_at: Option<Instant>,
}

impl Entry {
    // == Constructor ==
    /// Creates a new entry that expires `ttl` from now, or never.
    pub fn new(value: StoredValue, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: deadline_after(ttl),
        }
    }

    /// Replaces the deadline with one `ttl` from now.
    pub fn reset_ttl(&mut self, ttl: Duration) {
        self.expires_at = deadline_after(Some(ttl));
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its deadline, so a
    /// zero TTL is already expired at the first check.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the remaining TTL, or None if no expiration is set.
    ///
    /// Returns `Some(Duration::ZERO)` once the entry has expired.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(Instant::now()))
    }
}

// An unrepresentable deadline is far enough away to mean "never"
fn deadline_after(ttl: Option<Duration>) -> Option<Instant> {
    ttl.and_then(|ttl| Instant::now().checked_add(ttl))
}
