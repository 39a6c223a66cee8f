//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Name of the process-wide store, also used as `cache_name` in events raised
/// by top-level store operations.
pub const DEFAULT_STORE_NAME: &str = "default_store";

/// Server configuration parameters.
///
/// Built once at start-up and passed down; nothing reads the environment
/// after that.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL in seconds for entries without explicit TTL, None = never expire
    pub default_ttl: Option<u64>,
    /// HTTP server port
    pub server_port: u16,
    /// Background sweep interval in seconds
    pub cleanup_interval: u64,
    /// Name of the default store
    pub store_name: String,
    /// Directory for JSON backups
    pub backup_dir: PathBuf,
    /// Automatic backup interval in seconds, 0 disables it
    pub auto_backup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: unset, never expire)
    /// - `SERVER_PORT` - HTTP server port (default: 6379)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 1)
    /// - `STORE_NAME` - Name of the default store (default: default_store)
    /// - `BACKUP_DIR` - Backup directory (default: cache_backup)
    /// - `AUTO_BACKUP_INTERVAL` - Backup frequency in seconds (default: 300)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl: env_parse("DEFAULT_TTL"),
            server_port: env_parse("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: env_parse("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            store_name: env::var("STORE_NAME")
                .ok()
                .filter(|name| !name.is_empty())
                .unwrap_or(defaults.store_name),
            backup_dir: env::var("BACKUP_DIR")
                .ok()
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.backup_dir),
            auto_backup_interval: env_parse("AUTO_BACKUP_INTERVAL")
                .unwrap_or(defaults.auto_backup_interval),
        }
    }

    /// Store settings derived from this configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new()
            .with_name(self.store_name.clone())
            .with_default_ttl(self.default_ttl.map(Duration::from_secs))
            .with_cleanup_interval(Duration::from_secs(self.cleanup_interval))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl: None,
            server_port: 6379,
            cleanup_interval: 1,
            store_name: DEFAULT_STORE_NAME.to_string(),
            backup_dir: PathBuf::from("cache_backup"),
            auto_backup_interval: 300,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

// == Store Config ==
/// Settings for one `ExpiringStore`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Name carried in events raised by top-level operations
    pub name: String,
    /// TTL applied by `set` when none is given
    pub default_ttl: Option<Duration>,
    /// Interval between background sweeps
    pub cleanup_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_STORE_NAME.to_string(),
            default_ttl: None,
            cleanup_interval: Duration::from_secs(1),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the sweep interval. Zero is bumped to one millisecond.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval.max(Duration::from_millis(1));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_ttl, None);
        assert_eq!(config.server_port, 6379);
        assert_eq!(config.cleanup_interval, 1);
        assert_eq!(config.store_name, "default_store");
        assert_eq!(config.backup_dir, PathBuf::from("cache_backup"));
        assert_eq!(config.auto_backup_interval, 300);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("DEFAULT_TTL");
        env::remove_var("SERVER_PORT");
        env::remove_var("CLEANUP_INTERVAL");
        env::remove_var("STORE_NAME");
        env::remove_var("BACKUP_DIR");
        env::remove_var("AUTO_BACKUP_INTERVAL");

        let config = Config::from_env();
        assert_eq!(config.default_ttl, None);
        assert_eq!(config.server_port, 6379);
        assert_eq!(config.cleanup_interval, 1);
        assert_eq!(config.store_name, "default_store");
        assert_eq!(config.auto_backup_interval, 300);
    }

    #[test]
    fn test_store_config_from_config() {
        let config = Config {
            default_ttl: Some(30),
            cleanup_interval: 5,
            store_name: "primary".to_string(),
            ..Config::default()
        };

        let store = config.store_config();
        assert_eq!(store.name, "primary");
        assert_eq!(store.default_ttl, Some(Duration::from_secs(30)));
        assert_eq!(store.cleanup_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_cleanup_interval_is_clamped() {
        let store = StoreConfig::new().with_cleanup_interval(Duration::ZERO);
        assert_eq!(store.cleanup_interval, Duration::from_millis(1));
    }
}
