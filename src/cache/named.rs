//! Named Cache Module
//!
//! The container stored under a cache's top-level key: its items plus the
//! statistics that live and die with it.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::cache::CacheStats;

// == Named Cache ==
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamedCache {
    items: HashMap<String, Value>,
    stats: CacheStats,
}

impl NamedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Reads a value and records a hit or a miss.
    pub fn lookup(&mut self, key: &str) -> Option<Value> {
        match self.items.get(key) {
            Some(value) => {
                self.stats.record_hit();
                Some(value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Stores a value, returning the one it replaced.
    pub fn insert(&mut self, key: String, value: Value) -> Option<Value> {
        let old = self.items.insert(key, value);
        self.stats.set_items(self.items.len());
        old
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let old = self.items.remove(key);
        self.stats.set_items(self.items.len());
        old
    }

    /// Empties the cache, returning the removed items sorted by key.
    pub fn drain_sorted(&mut self) -> Vec<(String, Value)> {
        let mut drained: Vec<(String, Value)> = self.items.drain().collect();
        drained.sort_by(|a, b| a.0.cmp(&b.0));
        self.stats.set_items(0);
        drained
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.items.iter()
    }

    /// Keys sorted for stable output.
    pub fn keys_sorted(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.items.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn items(&self) -> &HashMap<String, Value> {
        &self.items
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .items
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_tracks_item_count() {
        let mut cache = NamedCache::new();
        assert!(cache.insert("a".to_string(), json!(1)).is_none());
        assert_eq!(cache.insert("a".to_string(), json!(2)), Some(json!(1)));
        cache.insert("b".to_string(), json!(3));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().items, 2);

        assert_eq!(cache.remove("a"), Some(json!(2)));
        assert_eq!(cache.stats().items, 1);
    }

    #[test]
    fn test_lookup_records_hits_and_misses() {
        let mut cache = NamedCache::new();
        cache.insert("a".to_string(), json!(1));

        assert_eq!(cache.lookup("a"), Some(json!(1)));
        assert_eq!(cache.lookup("missing"), None);

        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_drain_sorted() {
        let mut cache = NamedCache::new();
        cache.insert("b".to_string(), json!(2));
        cache.insert("a".to_string(), json!(1));

        let drained = cache.drain_sorted();
        assert_eq!(
            drained,
            vec![("a".to_string(), json!(1)), ("b".to_string(), json!(2))]
        );
        assert!(cache.is_empty());
        assert_eq!(cache.stats().items, 0);
    }
}
