//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check store and handler behaviour over random operation
//! sequences.

use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::cache::{glob_match, CacheHandler, ExpiringStore, StoredValue};
use crate::config::StoreConfig;
use crate::events::EventKind;

// == Strategies ==
/// Short keys so that operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-e]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z ]{0,16}".prop_map(|s| json!(s)),
        (any::<bool>(), "[a-z]{1,8}").prop_map(|(flag, name)| json!({"flag": flag, "name": name})),
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

fn new_handler() -> CacheHandler {
    CacheHandler::new(Arc::new(ExpiringStore::new(StoreConfig::new())))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // **Property 1: Model Equivalence**
    // For any sequence of set/get/delete on one cache, the cache behaves like
    // a plain map and its counters match the observed hits and misses.
    #[test]
    fn prop_handler_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let handler = new_handler();
        handler.create_cache("c");
        let mut model: HashMap<String, Value> = HashMap::new();
        let (mut hits, mut misses) = (0u64, 0u64);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    prop_assert!(handler.set("c", &key, value.clone(), None));
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    let got = handler.get("c", &key);
                    let expected = model.get(&key).cloned();
                    prop_assert_eq!(&got, &expected);
                    if got.is_some() { hits += 1 } else { misses += 1 }
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(handler.delete("c", &key), model.remove(&key).is_some());
                }
            }
        }

        let stats = handler.get_stats("c").unwrap();
        prop_assert_eq!(stats.hits, hits);
        prop_assert_eq!(stats.misses, misses);
        prop_assert_eq!(stats.items, model.len());
        prop_assert_eq!(handler.cache_get_all("c").unwrap(), model);
    }

    // **Property 2: Old Value Reporting**
    // Every Set event carries exactly the value the key held before the write.
    #[test]
    fn prop_set_events_report_previous_value(
        writes in prop::collection::vec((key_strategy(), value_strategy()), 1..40)
    ) {
        let handler = new_handler();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        handler.on(EventKind::Set, None, move |ctx| {
            sink.lock().push(ctx.old_value.clone());
            Ok(())
        });

        let mut model: HashMap<String, Value> = HashMap::new();
        let mut expected = Vec::new();
        for (key, value) in writes {
            expected.push(model.insert(key.clone(), value.clone()));
            handler.set("c", &key, value, None);
        }

        let seen = seen.lock();
        prop_assert_eq!(&*seen, &expected);
    }

    // **Property 3: Store Keys Are Sorted And Live**
    // keys() lists each live key once, in order, and nothing that expired.
    #[test]
    fn prop_store_keys_sorted_and_live(
        live in prop::collection::btree_set(key_strategy(), 0..10),
        dead in prop::collection::btree_set("[f-h]{1,2}", 0..5),
    ) {
        let store = ExpiringStore::new(StoreConfig::new());
        for key in &live {
            store.set(key.clone(), json!(key), None);
        }
        for key in &dead {
            store.set(key.clone(), json!(key), Some(Duration::ZERO));
        }

        let keys = store.keys();
        let expected: Vec<String> = live.iter().cloned().collect();
        prop_assert_eq!(keys, expected);
        prop_assert_eq!(store.len(), live.len());
    }

    // **Property 4: Clear Order**
    // clear_cache publishes one Delete per item in ascending key order.
    #[test]
    fn prop_clear_publishes_sorted_deletes(keys in prop::collection::vec(key_strategy(), 0..20)) {
        let handler = new_handler();
        handler.create_cache("c");
        for key in &keys {
            handler.set("c", key, json!(1), None);
        }

        let deleted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&deleted);
        handler.on(EventKind::Delete, Some("c"), move |ctx| {
            sink.lock().push(ctx.key.clone().unwrap_or_default());
            Ok(())
        });

        prop_assert!(handler.clear_cache("c"));

        let expected: Vec<String> = keys.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect();
        let deleted = deleted.lock();
        prop_assert_eq!(&*deleted, &expected);
        prop_assert_eq!(handler.get_cache_size("c"), 0);
    }

    // **Property 5: Star Glob Matches Everything**
    #[test]
    fn prop_star_matches_any_key(key in "[a-zA-Z0-9 _:.-]{0,32}") {
        prop_assert!(glob_match("*", &key));
        let prefixed = format!("{}*", key);
        prop_assert!(glob_match(&prefixed, &key));
    }

    // **Property 6: Literal Glob Is Equality**
    #[test]
    fn prop_literal_glob_is_equality(a in "[a-z0-9_:]{0,12}", b in "[a-z0-9_:]{0,12}") {
        prop_assert_eq!(glob_match(&a, &b), a == b);
    }

    // **Property 7: Plain Values Are Not Caches**
    // A top-level plain value is never listed, written through or deleted as a cache.
    #[test]
    fn prop_plain_values_are_not_caches(name in key_strategy(), value in value_strategy()) {
        let handler = new_handler();
        handler.store().set(name.clone(), value.clone(), None);

        prop_assert!(!handler.create_cache(&name));
        prop_assert!(!handler.set(&name, "k", json!(1), None));
        prop_assert!(!handler.delete_cache(&name));
        prop_assert!(handler.list_caches().is_empty());
        prop_assert_eq!(handler.store().get(&name), Some(StoredValue::Value(value)));
    }
}

// == Concurrency ==
#[test]
fn test_concurrent_writers_on_distinct_keys() {
    const WRITERS: usize = 8;
    const PER_WRITER: usize = 200;

    let handler = Arc::new(new_handler());
    let sets = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&sets);
    handler.on(EventKind::Set, None, move |_| {
        *sink.lock() += 1;
        Ok(())
    });

    let threads: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let handler = Arc::clone(&handler);
            std::thread::spawn(move || {
                for i in 0..PER_WRITER {
                    handler.set("shared", &format!("w{}:{}", writer, i), json!(i), None);
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    assert_eq!(handler.get_cache_size("shared"), WRITERS * PER_WRITER);
    assert_eq!(handler.get_stats("shared").unwrap().items, WRITERS * PER_WRITER);
    assert_eq!(*sets.lock(), WRITERS * PER_WRITER);
    assert_eq!(handler.list_caches(), vec!["shared".to_string()]);
}

#[test]
fn test_concurrent_increments_are_atomic_under_lock() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 100;

    let store = Arc::new(ExpiringStore::new(StoreConfig::new()));
    store.set("counter", json!(0), None);

    let threads: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..ROUNDS {
                    store.with_locked(|guard| {
                        let current = guard
                            .get("counter")
                            .and_then(StoredValue::as_value)
                            .and_then(Value::as_u64)
                            .unwrap_or(0);
                        guard.insert("counter".to_string(), json!(current + 1).into(), None);
                    });
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    assert_eq!(
        store.get("counter"),
        Some(StoredValue::Value(json!(THREADS * ROUNDS)))
    );
}
