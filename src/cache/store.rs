//! Expiring Store Module
//!
//! One flat map from key to value with optional deadlines, guarded by a
//! single mutex. Expired entries are removed lazily on access and in bulk by
//! the background sweep.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::cache::{Entry, StoredValue};
use crate::config::StoreConfig;
use crate::error::{CacheError, Result};
use crate::events::{EventBus, EventContext, EventKind};
use crate::tasks::{spawn_sweep_task, TaskHandle};

// == Expiring Store ==
/// Thread-safe key-value store with per-entry TTL.
///
/// Every public operation holds the store lock for its whole critical
/// section, including event publication. Callbacks therefore run while the
/// lock is held and must not call back into the same store.
pub struct ExpiringStore {
    /// Name carried in events for top-level operations
    name: String,
    /// TTL used by `set` when the caller gives none
    default_ttl: Option<Duration>,
    /// Interval of the background sweep
    cleanup_interval: Duration,
    /// Key-value storage
    entries: Mutex<HashMap<String, Entry>>,
    /// Event callbacks
    events: Arc<EventBus>,
    /// Running sweep task, if started
    sweeper: Mutex<Option<TaskHandle>>,
}

impl ExpiringStore {
    // == Constructor ==
    /// Creates a store with its own event bus. No sweep runs until
    /// [`start_sweeper`](Self::start_sweeper) is called.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_events(config, Arc::new(EventBus::new()))
    }

    /// Creates a store that publishes through an existing event bus.
    pub fn with_events(config: StoreConfig, events: Arc<EventBus>) -> Self {
        Self {
            name: config.name,
            default_ttl: config.default_ttl,
            cleanup_interval: config.cleanup_interval,
            entries: Mutex::new(HashMap::new()),
            events,
            sweeper: Mutex::new(None),
        }
    }

    /// Creates a shared store and starts its background sweep.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: StoreConfig) -> Arc<Self> {
        let store = Arc::new(Self::new(config));
        store.start_sweeper();
        store
    }

    // == Background Sweep ==
    /// Spawns the sweep task. Returns false if one is already running.
    pub fn start_sweeper(self: &Arc<Self>) -> bool {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            return false;
        }
        *sweeper = Some(spawn_sweep_task(Arc::downgrade(self), self.cleanup_interval));
        true
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stops the background sweep and waits for the task to exit.
    ///
    /// Safe to call more than once. Once this returns no sweep iteration
    /// touches the store.
    pub async fn stop(&self) {
        let task = self.sweeper.lock().take();
        if let Some(task) = task {
            task.shutdown().await;
            info!(store = %self.name, "Background sweep stopped");
        }
    }

    // == Accessors ==
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    // == Locked View ==
    /// Runs `f` with the store lock held.
    ///
    /// Everything `f` does through the guard, publishing included, is one
    /// critical section. This is how read-modify-write sequences on a single
    /// entry stay atomic.
    pub fn with_locked<R>(&self, f: impl FnOnce(&mut StoreGuard<'_>) -> R) -> R {
        let mut guard = StoreGuard {
            store: self,
            entries: self.entries.lock(),
        };
        f(&mut guard)
    }

    // == Set ==
    /// Stores a value, replacing any previous entry under `key`.
    ///
    /// The deadline is `ttl` from now, else the store's default TTL from now,
    /// else none. Publishes `Set` with the replaced live value as `old_value`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<StoredValue>, ttl: Option<Duration>) {
        let key = key.into();
        let value = value.into();
        let rendered = value.to_json();
        let ttl = ttl.or(self.default_ttl);

        self.with_locked(|guard| {
            let old = guard.insert(key.clone(), value, ttl);
            guard.publish(
                EventContext::new(EventKind::Set, guard.store_name())
                    .with_key(key)
                    .with_value(rendered)
                    .with_old_value(old.map(|v| v.to_json())),
            );
        });
    }

    // == Get ==
    /// Returns the live value under `key`.
    ///
    /// A present-but-expired entry is removed on the spot.
    pub fn get(&self, key: &str) -> Option<StoredValue> {
        self.with_locked(|guard| guard.get(key).cloned())
    }

    /// Live value under `key` with its remaining TTL (None = no expiry).
    pub fn get_with_ttl(&self, key: &str) -> Option<(StoredValue, Option<Duration>)> {
        self.with_locked(|guard| {
            guard
                .live_entry(key)
                .map(|entry| (entry.value.clone(), entry.ttl_remaining()))
        })
    }

    /// Like [`get`](Self::get) with a fallback.
    pub fn get_or(&self, key: &str, default: impl Into<StoredValue>) -> StoredValue {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Same lazy-expiry check as [`get`](Self::get).
    pub fn contains(&self, key: &str) -> bool {
        self.with_locked(|guard| guard.contains(key))
    }

    // == Delete ==
    /// Removes `key` and publishes `Delete` with the removed value.
    pub fn delete(&self, key: &str) -> Result<StoredValue> {
        self.with_locked(|guard| {
            let removed = guard
                .remove(key)
                .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
            guard.publish(
                EventContext::new(EventKind::Delete, guard.store_name())
                    .with_key(key)
                    .with_old_value(Some(removed.to_json())),
            );
            Ok(removed)
        })
    }

    // == Expire ==
    /// Gives a live key a new deadline `ttl` from now.
    ///
    /// Publishes `Set` with the unchanged value as both `value` and
    /// `old_value`. Returns false for a missing or expired key.
    pub fn expire(&self, key: &str, ttl: Duration) -> bool {
        self.with_locked(|guard| {
            let Some(entry) = guard.live_entry(key) else {
                return false;
            };
            entry.reset_ttl(ttl);
            let rendered = entry.value.to_json();
            guard.publish(
                EventContext::new(EventKind::Set, guard.store_name())
                    .with_key(key)
                    .with_value(rendered.clone())
                    .with_old_value(Some(rendered)),
            );
            true
        })
    }

    // == Keys ==
    /// Sweeps, then returns a sorted snapshot of the live keys.
    pub fn keys(&self) -> Vec<String> {
        self.with_locked(|guard| {
            guard.sweep();
            let mut keys: Vec<String> = guard.iter_live().map(|(k, _)| k.clone()).collect();
            keys.sort();
            keys
        })
    }

    // == Clear ==
    /// Removes every entry.
    ///
    /// Publishes one `Delete` per live entry in key order, then one `Clear`.
    /// Returns the number of live entries removed.
    pub fn clear(&self) -> usize {
        self.with_locked(|guard| {
            let removed = guard.drain_live_sorted();
            for (key, value) in &removed {
                guard.publish(
                    EventContext::new(EventKind::Delete, guard.store_name())
                        .with_key(key.clone())
                        .with_old_value(Some(value.to_json())),
                );
            }
            guard.publish(EventContext::new(EventKind::Clear, guard.store_name()));
            removed.len()
        })
    }

    // == Cleanup Expired ==
    /// Removes all expired entries without publishing events.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&self) -> usize {
        self.with_locked(|guard| guard.sweep())
    }

    // == Length ==
    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.with_locked(|guard| guard.iter_live().count())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for ExpiringStore {
    fn drop(&mut self) {
        if let Some(task) = self.sweeper.get_mut().take() {
            task.signal();
        }
    }
}

impl fmt::Debug for ExpiringStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("name", &self.name)
            .field("default_ttl", &self.default_ttl)
            .field("cleanup_interval", &self.cleanup_interval)
            .field("entries", &self.entries.lock().len())
            .finish()
    }
}

// == Store Guard ==
/// Locked view of an [`ExpiringStore`], handed out by
/// [`ExpiringStore::with_locked`].
///
/// Raw operations here never publish; callers publish explicitly through
/// [`publish`](Self::publish) while still holding the lock.
pub struct StoreGuard<'a> {
    store: &'a ExpiringStore,
    entries: MutexGuard<'a, HashMap<String, Entry>>,
}

impl StoreGuard<'_> {
    pub fn store_name(&self) -> &str {
        &self.store.name
    }

    fn live_entry(&mut self, key: &str) -> Option<&mut Entry> {
        if self.entries.get(key)?.is_expired() {
            self.entries.remove(key);
            debug!(store = %self.store.name, key, "Removed expired entry on access");
            return None;
        }
        self.entries.get_mut(key)
    }

    /// Live value under `key`; an expired entry is removed instead.
    pub fn get(&mut self, key: &str) -> Option<&StoredValue> {
        self.live_entry(key).map(|entry| &entry.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut StoredValue> {
        self.live_entry(key).map(|entry| &mut entry.value)
    }

    pub fn contains(&mut self, key: &str) -> bool {
        self.live_entry(key).is_some()
    }

    /// Inserts with exactly `ttl` (no default applied) and returns the live
    /// value it replaced.
    pub fn insert(
        &mut self,
        key: String,
        value: StoredValue,
        ttl: Option<Duration>,
    ) -> Option<StoredValue> {
        let now = Instant::now();
        self.entries
            .insert(key, Entry::new(value, ttl))
            .filter(|previous| !previous.is_expired_at(now))
            .map(|previous| previous.value)
    }

    /// Removes `key`, returning its value if it was still live.
    pub fn remove(&mut self, key: &str) -> Option<StoredValue> {
        let entry = self.entries.remove(key)?;
        if entry.is_expired() {
            None
        } else {
            Some(entry.value)
        }
    }

    /// Live entries, without removing expired ones.
    pub fn iter_live(&self) -> impl Iterator<Item = (&String, &StoredValue)> + '_ {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(move |(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key, &entry.value))
    }

    /// Entry count including expired entries not yet swept.
    pub fn physical_len(&self) -> usize {
        self.entries.len()
    }

    /// Drops every expired entry. Returns how many were dropped.
    pub fn sweep(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        before - self.entries.len()
    }

    /// Empties the store, returning the live entries sorted by key.
    pub fn drain_live_sorted(&mut self) -> Vec<(String, StoredValue)> {
        let now = Instant::now();
        let mut live: Vec<(String, StoredValue)> = self
            .entries
            .drain()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key, entry.value))
            .collect();
        live.sort_by(|a, b| a.0.cmp(&b.0));
        live
    }

    /// Publishes through the store's event bus with the lock still held.
    pub fn publish(&self, ctx: EventContext) {
        self.store.events.publish(&ctx);
    }
}
