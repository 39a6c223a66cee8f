//! Backup Manager
//!
//! Writes each named cache to `cache_{name}_{timestamp}.json` and reads such
//! files back into a live handler.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheHandler, CacheStats};
use crate::error::{CacheError, Result};

/// `type` tag of a named-cache backup file.
pub const BACKUP_KIND_NAMED_CACHE: &str = "named_cache";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const SECONDS_PER_DAY: u64 = 86_400;

// == Backup File ==
/// On-disk layout of one cache backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupFile {
    #[serde(rename = "type")]
    pub kind: String,
    pub cache_name: String,
    /// `YYYYmmdd_HHMMSS`, also embedded in the file name
    pub timestamp: String,
    pub datetime: DateTime<Utc>,
    pub item_count: usize,
    pub data: HashMap<String, Value>,
    #[serde(default)]
    pub stats: Option<CacheStats>,
}

/// Listing entry for one backup file.
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

// == Backup Manager ==
#[derive(Debug)]
pub struct BackupManager {
    backup_dir: PathBuf,
}

impl BackupManager {
    /// Opens `backup_dir`, creating it if needed.
    pub fn new(backup_dir: impl Into<PathBuf>) -> Result<Self> {
        let backup_dir = backup_dir.into();
        fs::create_dir_all(&backup_dir).map_err(|e| {
            CacheError::Persistence(format!(
                "Failed to create backup directory {}: {}",
                backup_dir.display(),
                e
            ))
        })?;
        Ok(Self { backup_dir })
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    // == Backup ==
    /// Writes one cache to a new timestamped file and returns its path.
    ///
    /// A backup taken within the same second as the previous one replaces it.
    pub fn backup_cache(&self, handler: &CacheHandler, cache_name: &str) -> Result<PathBuf> {
        let data = handler
            .cache_get_all(cache_name)
            .ok_or_else(|| CacheError::NotFound(format!("Cache '{}'", cache_name)))?;

        let now = Utc::now();
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
        let backup = BackupFile {
            kind: BACKUP_KIND_NAMED_CACHE.to_string(),
            cache_name: cache_name.to_string(),
            timestamp: timestamp.clone(),
            datetime: now,
            item_count: data.len(),
            data,
            stats: handler.export_stats(cache_name),
        };

        let path = self
            .backup_dir
            .join(format!("cache_{}_{}.json", cache_name, timestamp));
        let file = File::create(&path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), &backup)?;

        debug!(cache = cache_name, path = %path.display(), "Cache backed up");
        Ok(path)
    }

    /// Backs up every live cache. Failures are logged and reported as false.
    pub fn backup_all(&self, handler: &CacheHandler) -> BTreeMap<String, bool> {
        handler
            .list_caches()
            .into_iter()
            .map(|name| {
                let ok = match self.backup_cache(handler, &name) {
                    Ok(_) => true,
                    Err(err) => {
                        warn!(cache = %name, "Backup failed: {}", err);
                        false
                    }
                };
                (name, ok)
            })
            .collect()
    }

    // == Restore ==
    /// Loads a backup file into `handler` and returns the cache name.
    ///
    /// Items are merged into the cache, overwriting keys present in both, and
    /// the saved hit/miss counters are restored.
    pub fn restore_cache(&self, handler: &CacheHandler, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            CacheError::NotFound(format!("Backup file {}: {}", path.display(), e))
        })?;
        let backup: BackupFile = serde_json::from_reader(BufReader::new(file))?;

        if backup.kind != BACKUP_KIND_NAMED_CACHE {
            return Err(CacheError::Persistence(format!(
                "Unsupported backup type '{}'",
                backup.kind
            )));
        }

        let name = backup.cache_name;
        handler.create_cache(&name);
        if !handler.cache_exists(&name) {
            return Err(CacheError::Conflict(format!(
                "'{}' holds a value that is not a cache",
                name
            )));
        }

        let restored = backup.data.len();
        for (key, value) in backup.data {
            handler.set(&name, &key, value, None);
        }
        if let Some(stats) = &backup.stats {
            handler.import_stats(&name, stats);
        }

        info!(cache = %name, items = restored, "Restored cache from {}", path.display());
        Ok(name)
    }

    /// Restores the newest backup of every cache found in the backup
    /// directory and returns the names restored, sorted.
    ///
    /// A file that fails to load is logged and skipped.
    pub fn restore_latest(&self, handler: &CacheHandler) -> Result<Vec<String>> {
        let mut newest: BTreeMap<String, (String, PathBuf)> = BTreeMap::new();
        for entry in fs::read_dir(&self.backup_dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some((name, stamp)) = split_backup_name(&file_name) else {
                continue;
            };
            let newer = newest
                .get(name)
                .map_or(true, |(current, _)| stamp > current.as_str());
            if newer {
                newest.insert(name.to_string(), (stamp.to_string(), entry.path()));
            }
        }

        let mut restored = Vec::with_capacity(newest.len());
        for (name, (_, path)) in newest {
            match self.restore_cache(handler, &path) {
                Ok(name) => restored.push(name),
                Err(err) => warn!(cache = %name, "Skipping backup {}: {}", path.display(), err),
            }
        }
        restored.sort();
        Ok(restored)
    }

    // == Listing ==
    /// Backup files, newest first, optionally only those of one cache.
    pub fn list_backups(&self, cache_name: Option<&str>) -> Result<Vec<BackupInfo>> {
        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.backup_dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !file_name.ends_with(".json") {
                continue;
            }
            if let Some(name) = cache_name {
                if !belongs_to(&file_name, name) {
                    continue;
                }
            }

            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            backups.push(BackupInfo {
                path: entry.path(),
                file_name,
                size: metadata.len(),
                modified: metadata.modified()?.into(),
            });
        }

        backups.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.file_name.cmp(&a.file_name))
        });
        Ok(backups)
    }

    // == Retention ==
    /// Deletes backup files last modified more than `days` days ago.
    pub fn cleanup_old_backups(&self, days: u64) -> Result<usize> {
        let max_age = Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY));
        let cutoff = SystemTime::now()
            .checked_sub(max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = 0;
        for backup in self.list_backups(None)? {
            let modified: SystemTime = backup.modified.into();
            if modified < cutoff {
                fs::remove_file(&backup.path)?;
                info!("Deleted old backup: {}", backup.file_name);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Splits `cache_{name}_{YYYYmmdd_HHMMSS}.json` into name and timestamp.
fn split_backup_name(file_name: &str) -> Option<(&str, &str)> {
    let rest = file_name.strip_prefix("cache_")?.strip_suffix(".json")?;
    let split = rest.len().checked_sub(16)?;
    if split == 0 || !rest.is_char_boundary(split) {
        return None;
    }
    let (name, stamp) = rest.split_at(split);
    let stamp = stamp.strip_prefix('_')?;
    let well_formed = stamp
        .char_indices()
        .all(|(i, c)| if i == 8 { c == '_' } else { c.is_ascii_digit() });
    well_formed.then_some((name, stamp))
}

fn belongs_to(file_name: &str, cache_name: &str) -> bool {
    split_backup_name(file_name).is_some_and(|(name, _)| name == cache_name)
}
