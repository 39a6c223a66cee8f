//! Event Context Module
//!
//! Immutable snapshot of a single mutation, handed to every matching callback.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

// == Event Kind ==
/// The kind of mutation an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A value was stored (new key or overwrite)
    Set,
    /// A key was removed by an explicit delete or a clear
    Delete,
    /// A store or cache was emptied
    Clear,
    /// A named cache was created
    CreateCache,
    /// A named cache is about to be removed
    DeleteCache,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Set => "set",
            EventKind::Delete => "delete",
            EventKind::Clear => "clear",
            EventKind::CreateCache => "create_cache",
            EventKind::DeleteCache => "delete_cache",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Event Context ==
/// Snapshot of a mutation taken while the store lock is held.
///
/// `cache_name` is the named cache the mutation touched, or the store name
/// (`default_store` unless configured otherwise) for top-level operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventContext {
    pub cache_name: String,
    pub key: Option<String>,
    pub value: Option<Value>,
    pub old_value: Option<Value>,
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
}

impl EventContext {
    /// Creates a context with no key or values, stamped with the current time.
    pub fn new(kind: EventKind, cache_name: impl Into<String>) -> Self {
        Self {
            cache_name: cache_name.into(),
            key: None,
            value: None,
            old_value: None,
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_old_value(mut self, old_value: Option<Value>) -> Self {
        self.old_value = old_value;
        self
    }
}
