//! Cache Handler Module
//!
//! Named caches layered on one `ExpiringStore`. Each cache is a single store
//! entry holding a `NamedCache`; every cache-scoped operation reads, mutates
//! and publishes inside one `with_locked` section of that store.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::search::{glob_match, path_exists, value_matches};
use crate::cache::{CacheStats, ExpiringStore, NamedCache, StoreStats, StoredValue};
use crate::error::{CacheError, Result};
use crate::events::{EventBus, EventCallback, EventContext, EventKind};
use crate::persistence::BackupManager;

/// Snapshot of search matches, sorted by key.
pub type SearchResults = std::vec::IntoIter<(String, Value)>;

// == Cache Handler ==
pub struct CacheHandler {
    store: Arc<ExpiringStore>,
    /// Lookups against caches that do not exist
    absent_misses: AtomicU64,
    backups: Option<Arc<BackupManager>>,
}

impl CacheHandler {
    // == Constructor ==
    pub fn new(store: Arc<ExpiringStore>) -> Self {
        Self {
            store,
            absent_misses: AtomicU64::new(0),
            backups: None,
        }
    }

    /// Attaches the backup manager that `stop` flushes to.
    pub fn with_backups(mut self, backups: Arc<BackupManager>) -> Self {
        self.backups = Some(backups);
        self
    }

    pub fn store(&self) -> &Arc<ExpiringStore> {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventBus> {
        self.store.events()
    }

    pub fn backup_manager(&self) -> Option<&Arc<BackupManager>> {
        self.backups.as_ref()
    }

    // == Event Registration ==
    /// Registers `f` for `kind`, optionally scoped to one cache.
    pub fn on<F>(&self, kind: EventKind, cache_name: Option<&str>, f: F) -> EventCallback
    where
        F: Fn(&EventContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.events().subscribe(kind, cache_name, f)
    }

    /// Removes one `(kind, callback, cache_name)` registration.
    pub fn off(&self, kind: EventKind, callback: &EventCallback, cache_name: Option<&str>) -> bool {
        self.events().unsubscribe(kind, callback, cache_name)
    }

    // == Cache Lifecycle ==
    /// Creates an empty cache. False if anything already lives under `name`.
    ///
    /// The container takes the store's default TTL, if any.
    pub fn create_cache(&self, name: &str) -> bool {
        let default_ttl = self.store.default_ttl();
        let created = self.store.with_locked(|guard| {
            if guard.contains(name) {
                return false;
            }
            guard.insert(name.to_string(), NamedCache::new().into(), default_ttl);
            guard.publish(EventContext::new(EventKind::CreateCache, name));
            true
        });

        if created {
            info!(cache = name, "Created cache");
        } else {
            debug!(cache = name, "Cache name already in use");
        }
        created
    }

    /// Deletes a cache and its stats.
    ///
    /// `DeleteCache` is published before removal and carries the final
    /// contents as `old_value`, since callbacks cannot read the store while
    /// the lock is held.
    pub fn delete_cache(&self, name: &str) -> bool {
        let deleted = self.store.with_locked(|guard| {
            let Some(final_state) = guard
                .get(name)
                .and_then(StoredValue::as_cache)
                .map(NamedCache::to_json)
            else {
                return false;
            };
            guard.publish(
                EventContext::new(EventKind::DeleteCache, name).with_old_value(Some(final_state)),
            );
            guard.remove(name);
            true
        });

        if deleted {
            info!(cache = name, "Deleted cache");
        }
        deleted
    }

    /// Names of all live caches, sorted.
    pub fn list_caches(&self) -> Vec<String> {
        self.store.with_locked(|guard| {
            let mut names: Vec<String> = guard
                .iter_live()
                .filter(|(_, value)| value.is_cache())
                .map(|(name, _)| name.clone())
                .collect();
            names.sort();
            names
        })
    }

    pub fn cache_exists(&self, name: &str) -> bool {
        self.read_cache(name, |_| ()).is_some()
    }

    // == Set ==
    /// Stores `value` under `key` in `cache`.
    ///
    /// A missing cache is created on the spot, with `ttl` (else the store
    /// default) applied to the whole container. An existing cache keeps its
    /// deadline. Returns false only if `cache` names a plain value.
    pub fn set(&self, cache: &str, key: &str, value: Value, ttl: Option<Duration>) -> bool {
        let ttl = ttl.or(self.store.default_ttl());
        self.store.with_locked(|guard| {
            if !guard.contains(cache) {
                guard.insert(cache.to_string(), NamedCache::new().into(), ttl);
                guard.publish(EventContext::new(EventKind::CreateCache, cache));
                debug!(cache, ttl = ?ttl, "Created cache implicitly on set");
            }

            let Some(container) = guard.get_mut(cache).and_then(StoredValue::as_cache_mut) else {
                return false;
            };
            let old = container.insert(key.to_string(), value.clone());

            guard.publish(
                EventContext::new(EventKind::Set, cache)
                    .with_key(key)
                    .with_value(value)
                    .with_old_value(old),
            );
            true
        })
    }

    // == Get ==
    /// Reads one item, recording a hit or a miss.
    pub fn get(&self, cache: &str, key: &str) -> Option<Value> {
        let found = self.write_cache(cache, |container| container.lookup(key));
        match found {
            Some(value) => value,
            None => {
                self.absent_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Like [`get`](Self::get) with a fallback.
    pub fn get_or(&self, cache: &str, key: &str, default: Value) -> Value {
        self.get(cache, key).unwrap_or(default)
    }

    // == Delete ==
    pub fn delete(&self, cache: &str, key: &str) -> bool {
        self.store.with_locked(|guard| {
            let Some(container) = guard.get_mut(cache).and_then(StoredValue::as_cache_mut) else {
                return false;
            };
            let Some(old) = container.remove(key) else {
                return false;
            };

            guard.publish(
                EventContext::new(EventKind::Delete, cache)
                    .with_key(key)
                    .with_old_value(Some(old)),
            );
            true
        })
    }

    // == Clear ==
    /// Empties a cache: one `Delete` per item in key order, then `Clear`.
    pub fn clear_cache(&self, name: &str) -> bool {
        self.store.with_locked(|guard| {
            let Some(container) = guard.get_mut(name).and_then(StoredValue::as_cache_mut) else {
                return false;
            };
            let removed = container.drain_sorted();

            for (key, value) in removed {
                guard.publish(
                    EventContext::new(EventKind::Delete, name)
                        .with_key(key)
                        .with_old_value(Some(value)),
                );
            }
            guard.publish(EventContext::new(EventKind::Clear, name));
            true
        })
    }

    // == Bulk Reads ==
    pub fn get_cache_size(&self, name: &str) -> usize {
        self.read_cache(name, NamedCache::len).unwrap_or(0)
    }

    pub fn cache_keys(&self, name: &str) -> Vec<String> {
        self.read_cache(name, NamedCache::keys_sorted)
            .unwrap_or_default()
    }

    /// Copy of every item in a cache, or None if the cache does not exist.
    pub fn cache_get_all(&self, name: &str) -> Option<HashMap<String, Value>> {
        self.read_cache(name, |container| container.items().clone())
    }

    // == Search ==
    /// Items of `cache` accepted by `predicate`, sorted by key.
    ///
    /// The predicate runs under the store lock against the live contents;
    /// the returned iterator walks a snapshot. A missing cache yields nothing.
    pub fn search<P>(&self, cache: &str, mut predicate: P) -> SearchResults
    where
        P: FnMut(&str, &Value) -> bool,
    {
        let mut matches: Vec<(String, Value)> = self
            .read_cache(cache, |container| {
                container
                    .iter()
                    .filter(|(key, value)| predicate(key, value))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();
        matches.sort_by(|a, b| a.0.cmp(&b.0));
        matches.into_iter()
    }

    /// Key search by glob (default) or regex.
    ///
    /// A regex must match at the start of the key. No pattern, or an empty
    /// one, matches every key.
    pub fn search_by_pattern(
        &self,
        cache: &str,
        pattern: Option<&str>,
        is_regex: bool,
    ) -> Result<SearchResults> {
        let Some(pattern) = pattern.filter(|p| !p.is_empty()) else {
            return Ok(self.search(cache, |_, _| true));
        };

        if is_regex {
            let regex = Regex::new(pattern)
                .map_err(|err| CacheError::InvalidRequest(format!("Invalid regex: {}", err)))?;
            Ok(self.search(cache, |key, _| {
                regex.find(key).is_some_and(|m| m.start() == 0)
            }))
        } else {
            Ok(self.search(cache, |key, _| glob_match(pattern, key)))
        }
    }

    /// Items whose value contains the dotted `path` (`*` matches any key).
    pub fn search_json_path(&self, cache: &str, path: &str) -> SearchResults {
        let parts: Vec<&str> = path.split('.').collect();
        self.search(cache, |_, value| path_exists(value, &parts))
    }

    /// Keys whose value structurally contains `pattern`.
    pub fn find_by_value(&self, cache: &str, pattern: &Value) -> Vec<String> {
        self.search(cache, |_, value| value_matches(pattern, value))
            .map(|(key, _)| key)
            .collect()
    }

    // == Statistics ==
    pub fn get_stats(&self, name: &str) -> Option<CacheStats> {
        self.read_cache(name, |container| container.stats().clone())
    }

    pub fn get_all_stats(&self) -> BTreeMap<String, CacheStats> {
        self.store.with_locked(|guard| {
            guard
                .iter_live()
                .filter_map(|(name, value)| {
                    value
                        .as_cache()
                        .map(|container| (name.clone(), container.stats().clone()))
                })
                .collect()
        })
    }

    /// Zeroes hit and miss counters without touching data.
    pub fn reset_stats(&self, name: &str) -> bool {
        self.write_cache(name, |container| container.stats_mut().reset())
            .is_some()
    }

    /// Aggregate over all caches.
    pub fn get_store_stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total_misses: self.absent_misses.load(Ordering::Relaxed),
            ..StoreStats::default()
        };
        for cache_stats in self.get_all_stats().values() {
            stats.caches += 1;
            stats.total_items += cache_stats.items;
            stats.total_hits += cache_stats.hits;
            stats.total_misses += cache_stats.misses;
        }
        stats
    }

    /// Stats snapshot for the backup subsystem.
    pub fn export_stats(&self, name: &str) -> Option<CacheStats> {
        self.get_stats(name)
    }

    /// Restores traffic counters from a snapshot; the item count stays live.
    pub fn import_stats(&self, name: &str, snapshot: &CacheStats) -> bool {
        self.write_cache(name, |container| container.stats_mut().absorb(snapshot))
            .is_some()
    }

    // == Shutdown ==
    /// Writes every cache to the backup directory (if configured), then
    /// stops the store's sweep so the final snapshot reflects live data.
    ///
    /// The backup runs on the blocking pool.
    pub async fn stop(self: &Arc<Self>) {
        if let Some(backups) = self.backups.clone() {
            let handler = Arc::clone(self);
            match tokio::task::spawn_blocking(move || backups.backup_all(&handler)).await {
                Ok(results) => {
                    let saved = results.values().filter(|ok| **ok).count();
                    info!("Final backup: {}/{} caches saved", saved, results.len());
                }
                Err(err) => warn!("Final backup task failed: {}", err),
            }
        }
        self.store.stop().await;
    }

    // == Helpers ==
    fn read_cache<R>(&self, name: &str, f: impl FnOnce(&NamedCache) -> R) -> Option<R> {
        self.store
            .with_locked(|guard| guard.get(name).and_then(StoredValue::as_cache).map(f))
    }

    fn write_cache<R>(&self, name: &str, f: impl FnOnce(&mut NamedCache) -> R) -> Option<R> {
        self.store.with_locked(|guard| {
            guard
                .get_mut(name)
                .and_then(StoredValue::as_cache_mut)
                .map(f)
        })
    }
}

impl fmt::Debug for CacheHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheHandler")
            .field("store", &self.store)
            .field("backups", &self.backups)
            .finish()
    }
}
