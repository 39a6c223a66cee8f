//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Sweep: Removes expired store entries at configured intervals
//! - Auto Backup: Writes every named cache to the backup directory

mod backup;
mod sweep;

pub use backup::spawn_backup_task;
pub use sweep::spawn_sweep_task;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

// == Task Handle ==
/// Owner of a periodic background task.
///
/// Shutdown is cooperative: the task watches a channel between ticks and
/// exits when it flips, so awaiting [`shutdown`](Self::shutdown) guarantees
/// no further iteration runs.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl TaskHandle {
    pub(crate) fn new(
        name: &'static str,
        shutdown: watch::Sender<bool>,
        handle: JoinHandle<()>,
    ) -> Self {
        Self {
            name,
            shutdown,
            handle,
        }
    }

    /// Asks the task to exit without waiting for it.
    pub fn signal(&self) {
        // Err only means the task is already gone
        let _ = self.shutdown.send(true);
    }

    /// Asks the task to exit and waits until it has.
    pub async fn shutdown(self) {
        self.signal();
        let name = self.name;
        if let Err(err) = self.handle.await {
            warn!(task = name, "Background task ended abnormally: {}", err);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
