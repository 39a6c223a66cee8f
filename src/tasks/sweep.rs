//! TTL Sweep Task
//!
//! Background task that periodically removes expired store entries.

use std::sync::Weak;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::ExpiringStore;
use crate::tasks::TaskHandle;

/// Spawns a background task that sweeps `store` every `interval`.
///
/// The task only holds a weak reference, so it never keeps a store alive;
/// it exits on its own once the store is dropped, or when the returned
/// handle is shut down.
///
/// # Example
/// ```ignore
/// let store = Arc::new(ExpiringStore::new(StoreConfig::default()));
/// let sweeper = spawn_sweep_task(Arc::downgrade(&store), Duration::from_secs(1));
/// // Later, during shutdown:
/// sweeper.shutdown().await;
/// ```
pub fn spawn_sweep_task(store: Weak<ExpiringStore>, interval: Duration) -> TaskHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        info!("Starting TTL sweep task with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let Some(store) = store.upgrade() else {
                        break;
                    };

                    let removed = store.cleanup_expired();
                    if removed > 0 {
                        info!(store = %store.name(), "TTL sweep: removed {} expired entries", removed);
                    } else {
                        debug!(store = %store.name(), "TTL sweep: no expired entries found");
                    }
                }
            }
        }

        debug!("TTL sweep task exited");
    });

    TaskHandle::new("ttl-sweep", shutdown_tx, handle)
}
