//! Auto Backup Task
//!
//! Periodically writes every named cache to the backup directory.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::cache::CacheHandler;
use crate::tasks::TaskHandle;

/// Spawns a task that calls `backup_all` every `interval`.
///
/// File I/O runs on the blocking pool. The task exits when the handle is
/// shut down or the handler is dropped; a handler without a backup manager
/// is left alone.
pub fn spawn_backup_task(handler: Weak<CacheHandler>, interval: Duration) -> TaskHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        info!("Starting auto-backup task with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
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
                    let Some(handler) = handler.upgrade() else {
                        break;
                    };
                    let Some(manager) = handler.backup_manager().map(Arc::clone) else {
                        continue;
                    };

                    info!("Running automatic backup...");
                    let run = tokio::task::spawn_blocking(move || manager.backup_all(&handler)).await;
                    match run {
                        Ok(results) => {
                            let saved = results.values().filter(|ok| **ok).count();
                            info!("Backup completed: {}/{} successful", saved, results.len());
                        }
                        Err(err) => warn!("Automatic backup aborted: {}", err),
                    }
                }
            }
        }
    });

    TaskHandle::new("auto-backup", shutdown_tx, handle)
}
