//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::MAX_KEY_LENGTH;

/// Request body for PUT /set and PUT /caches/:name/items
///
/// # Fields
/// - `key`: The key to store the value under
/// - `value`: Any JSON value
/// - `ttl`: Optional TTL in seconds (uses the store default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The key
    pub key: String,
    /// The value to store
    pub value: Value,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key("Key", &self.key)
    }
}

/// Request body for PUT /expire/:key
#[derive(Debug, Clone, Deserialize)]
pub struct ExpireRequest {
    /// New TTL in seconds, counted from now
    pub ttl: u64,
}

/// Request body for POST /caches
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCacheRequest {
    pub name: String,
}

impl CreateCacheRequest {
    pub fn validate(&self) -> Option<String> {
        validate_cache_name(&self.name)
    }
}

/// Query string of GET /caches/:name/search
///
/// `path` takes precedence over `pattern` when both are given.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    /// Glob, or regex when `regex` is true
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub regex: bool,
    /// Dotted JSON path that matching values must contain
    #[serde(default)]
    pub path: Option<String>,
}

/// Request body for POST /caches/:name/find
#[derive(Debug, Clone, Deserialize)]
pub struct FindRequest {
    /// Structural pattern each matching value must contain
    pub pattern: Value,
}

/// Request body for POST /backups/restore
#[derive(Debug, Clone, Deserialize)]
pub struct RestoreRequest {
    /// Backup file name inside the backup directory
    pub file: String,
}

impl RestoreRequest {
    /// Only bare file names are accepted, never paths.
    pub fn validate(&self) -> Option<String> {
        if self.file.is_empty() {
            return Some("File name cannot be empty".to_string());
        }
        if self.file.contains(['/', '\\']) || self.file.starts_with('.') {
            return Some("File must be a plain backup file name".to_string());
        }
        None
    }
}

/// Query string of GET /backups
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackupListQuery {
    #[serde(default)]
    pub cache: Option<String>,
}

/// Query string of DELETE /backups
#[derive(Debug, Clone, Deserialize)]
pub struct BackupCleanupQuery {
    #[serde(default = "default_retention_days")]
    pub older_than_days: u64,
}

fn default_retention_days() -> u64 {
    30
}

// == Validation Helpers ==
fn validate_key(label: &str, key: &str) -> Option<String> {
    if key.is_empty() {
        return Some(format!("{} cannot be empty", label));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "{} exceeds maximum length of {} characters",
            label, MAX_KEY_LENGTH
        ));
    }
    None
}

/// Cache names end up in backup file names.
pub fn validate_cache_name(name: &str) -> Option<String> {
    if let Some(error) = validate_key("Cache name", name) {
        return Some(error);
    }
    if name.contains(['/', '\\']) || name.starts_with('.') {
        return Some("Cache name cannot contain path separators".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_request_deserialize() {
        let json = r#"{"key": "test", "value": {"name": "Alice"}}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.key, "test");
        assert_eq!(req.value, json!({"name": "Alice"}));
        assert!(req.ttl.is_none());
    }

    #[test]
    fn test_set_request_with_ttl() {
        let json = r#"{"key": "test", "value": "hello", "ttl": 60}"#;
        let req: SetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.ttl, Some(60));
    }

    #[test]
    fn test_validate_empty_key() {
        let req = SetRequest {
            key: "".to_string(),
            value: json!("test"),
            ttl: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_long_key() {
        let req = SetRequest {
            key: "k".repeat(MAX_KEY_LENGTH + 1),
            value: json!("test"),
            ttl: None,
        };
        assert!(req.validate().is_some());
    }

    #[test]
    fn test_validate_valid_request() {
        let req = SetRequest {
            key: "valid_key".to_string(),
            value: json!(1),
            ttl: Some(60),
        };
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_cache_name_validation() {
        assert!(validate_cache_name("users").is_none());
        assert!(validate_cache_name("").is_some());
        assert!(validate_cache_name("../etc").is_some());
        assert!(validate_cache_name("a/b").is_some());
    }

    #[test]
    fn test_search_query_defaults() {
        let query: SearchQuery = serde_json::from_str("{}").unwrap();
        assert!(query.pattern.is_none());
        assert!(!query.regex);
        assert!(query.path.is_none());
    }

    #[test]
    fn test_restore_request_rejects_paths() {
        let bad = RestoreRequest {
            file: "../secrets.json".to_string(),
        };
        let good = RestoreRequest {
            file: "cache_users_20240101_120000.json".to_string(),
        };
        assert!(bad.validate().is_some());
        assert!(good.validate().is_none());
    }

    #[test]
    fn test_cleanup_query_default() {
        let query: BackupCleanupQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.older_than_days, 30);
    }
}
