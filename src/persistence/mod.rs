//! Persistence Module
//!
//! Timestamped JSON backups of named caches.

mod backup;

pub use backup::{BackupFile, BackupInfo, BackupManager, BACKUP_KIND_NAMED_CACHE};
