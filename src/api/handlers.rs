//! API Handlers
//!
//! HTTP request handlers for each cache server endpoint.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::cache::{CacheHandler, ExpiringStore};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::models::{
    validate_cache_name, BackupCleanupQuery, BackupListQuery, BackupListResponse,
    BackupResponse, CacheListResponse, CacheStatsResponse, CleanupResponse, ClearResponse,
    CreateCacheRequest, DeleteResponse, ExpireRequest, FindRequest, FindResponse, GetResponse,
    HealthResponse, ItemsResponse, KeysResponse, MessageResponse, RestoreRequest,
    RestoreResponse, SearchQuery, SearchResponse, SetRequest, SetResponse, StatsResponse,
};
use crate::persistence::BackupManager;

/// Application state shared across all handlers.
///
/// The handler and its store synchronize internally, so the state is a
/// plain shared pointer.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheHandler>,
}

impl AppState {
    /// Creates a new AppState around an existing handler.
    pub fn new(cache: Arc<CacheHandler>) -> Self {
        Self { cache }
    }

    /// Builds store, backup manager and handler from configuration, then
    /// reloads the newest backup of each cache found in the backup directory.
    ///
    /// The background sweep is not started here.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Arc::new(ExpiringStore::new(config.store_config()));
        let backups = Arc::new(BackupManager::new(&config.backup_dir)?);
        let handler = CacheHandler::new(store).with_backups(Arc::clone(&backups));

        let restored = backups.restore_latest(&handler)?;
        if !restored.is_empty() {
            info!("Loaded {} cache(s) from {}", restored.len(), config.backup_dir.display());
        }
        Ok(Self::new(Arc::new(handler)))
    }

    fn backups(&self) -> Result<Arc<BackupManager>> {
        self.cache
            .backup_manager()
            .cloned()
            .ok_or_else(|| CacheError::Persistence("Backups are not configured".to_string()))
    }
}

fn ttl_from_secs(ttl: Option<u64>) -> Option<Duration> {
    ttl.map(Duration::from_secs)
}

fn check_cache_name(name: &str) -> Result<()> {
    match validate_cache_name(name) {
        Some(error_msg) => Err(CacheError::InvalidRequest(error_msg)),
        None => Ok(()),
    }
}

fn cache_not_found(name: &str) -> CacheError {
    CacheError::NotFound(format!("Cache '{}'", name))
}

/// Runs backup file I/O on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CacheError::Internal(format!("Backup task failed: {}", e)))?
}

// == Store Endpoints ==

/// Handler for PUT /set
///
/// Stores a value in the default store with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    state
        .cache
        .store()
        .set(req.key.clone(), req.value, ttl_from_secs(req.ttl));

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let (value, ttl) = state
        .cache
        .store()
        .get_with_ttl(&key)
        .ok_or_else(|| CacheError::NotFound(key.clone()))?;

    Ok(Json(GetResponse::new(key, value.to_json()).with_ttl(ttl)))
}

/// Handler for PUT /expire/:key
pub async fn expire_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<ExpireRequest>,
) -> Result<Json<MessageResponse>> {
    if !state.cache.store().expire(&key, Duration::from_secs(req.ttl)) {
        return Err(CacheError::NotFound(key));
    }
    Ok(Json(MessageResponse::new(format!(
        "TTL of '{}' set to {}s",
        key, req.ttl
    ))))
}

/// Handler for DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.cache.store().delete(&key)?;
    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /keys
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    Json(KeysResponse::new(state.cache.store().keys()))
}

/// Handler for DELETE /clear
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let cleared = state.cache.store().clear();
    Json(ClearResponse { cleared })
}

// == Cache Endpoints ==

/// Handler for GET /caches
pub async fn list_caches_handler(State(state): State<AppState>) -> Json<CacheListResponse> {
    Json(CacheListResponse::new(state.cache.list_caches()))
}

/// Handler for POST /caches
pub async fn create_cache_handler(
    State(state): State<AppState>,
    Json(req): Json<CreateCacheRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    if !state.cache.create_cache(&req.name) {
        return Err(CacheError::Conflict(format!(
            "'{}' already exists",
            req.name
        )));
    }

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!(
            "Cache '{}' created successfully",
            req.name
        ))),
    ))
}

/// Handler for DELETE /caches/:name
pub async fn delete_cache_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>> {
    if !state.cache.delete_cache(&name) {
        return Err(cache_not_found(&name));
    }
    Ok(Json(MessageResponse::new(format!(
        "Cache '{}' deleted successfully",
        name
    ))))
}

/// Handler for PUT /caches/:name/items
///
/// Creates the cache on first write.
pub async fn cache_set_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    check_cache_name(&name)?;
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    if !state
        .cache
        .set(&name, &req.key, req.value, ttl_from_secs(req.ttl))
    {
        return Err(CacheError::Conflict(format!(
            "'{}' holds a value that is not a cache",
            name
        )));
    }

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /caches/:name/items
pub async fn cache_items_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ItemsResponse>> {
    let items = state
        .cache
        .cache_get_all(&name)
        .ok_or_else(|| cache_not_found(&name))?;
    Ok(Json(ItemsResponse::new(name, items)))
}

/// Handler for DELETE /caches/:name/items
pub async fn cache_clear_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>> {
    if !state.cache.clear_cache(&name) {
        return Err(cache_not_found(&name));
    }
    Ok(Json(MessageResponse::new(format!(
        "Cache '{}' cleared successfully",
        name
    ))))
}

/// Handler for GET /caches/:name/items/:key
///
/// Counts as a hit or a miss in the cache's stats.
pub async fn cache_get_handler(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    let value = state
        .cache
        .get(&name, &key)
        .ok_or_else(|| CacheError::NotFound(format!("{}:{}", name, key)))?;
    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /caches/:name/items/:key
pub async fn cache_delete_handler(
    State(state): State<AppState>,
    Path((name, key)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    if !state.cache.delete(&name, &key) {
        return Err(CacheError::NotFound(format!("{}:{}", name, key)));
    }
    Ok(Json(DeleteResponse::new(key)))
}

// == Search Endpoints ==

/// Handler for GET /caches/:name/search
///
/// `?path=a.b` searches by JSON path, otherwise `?pattern=` is a glob, or a
/// regex with `&regex=true`.
pub async fn search_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>> {
    if !state.cache.cache_exists(&name) {
        return Err(cache_not_found(&name));
    }

    let matches = match query.path.as_deref().filter(|p| !p.is_empty()) {
        Some(path) => state.cache.search_json_path(&name, path),
        None => state
            .cache
            .search_by_pattern(&name, query.pattern.as_deref(), query.regex)?,
    };

    Ok(Json(SearchResponse::new(name, matches)))
}

/// Handler for POST /caches/:name/find
pub async fn find_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<FindRequest>,
) -> Result<Json<FindResponse>> {
    if !state.cache.cache_exists(&name) {
        return Err(cache_not_found(&name));
    }
    let keys = state.cache.find_by_value(&name, &req.pattern);
    Ok(Json(FindResponse::new(name, keys)))
}

// == Stats Endpoints ==

/// Handler for GET /caches/:name/stats
pub async fn cache_stats_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CacheStatsResponse>> {
    let stats = state
        .cache
        .get_stats(&name)
        .ok_or_else(|| cache_not_found(&name))?;
    Ok(Json(CacheStatsResponse::new(name, stats)))
}

/// Handler for DELETE /caches/:name/stats
pub async fn reset_stats_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<MessageResponse>> {
    if !state.cache.reset_stats(&name) {
        return Err(cache_not_found(&name));
    }
    Ok(Json(MessageResponse::new(format!(
        "Statistics for cache '{}' reset",
        name
    ))))
}

/// Handler for GET /stats
///
/// Store-wide totals across every named cache.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let store = state.cache.store();
    Json(StatsResponse::new(
        store.name(),
        store.len(),
        state.cache.get_store_stats(),
        store.events().callback_failures(),
    ))
}

// == Backup Endpoints ==

/// Handler for POST /caches/:name/backup
pub async fn backup_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BackupResponse>> {
    let backups = state.backups()?;
    let cache = Arc::clone(&state.cache);
    let cache_name = name.clone();

    let path = run_blocking(move || backups.backup_cache(&cache, &cache_name)).await?;

    Ok(Json(BackupResponse {
        cache: name,
        file: path.display().to_string(),
    }))
}

/// Handler for POST /backups/restore
///
/// Restores a file from the backup directory by name.
pub async fn restore_handler(
    State(state): State<AppState>,
    Json(req): Json<RestoreRequest>,
) -> Result<Json<RestoreResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let backups = state.backups()?;
    let cache = Arc::clone(&state.cache);
    let name = run_blocking(move || {
        let path = backups.backup_dir().join(&req.file);
        backups.restore_cache(&cache, path)
    })
    .await?;

    Ok(Json(RestoreResponse::new(name)))
}

/// Handler for GET /backups
pub async fn list_backups_handler(
    State(state): State<AppState>,
    Query(query): Query<BackupListQuery>,
) -> Result<Json<BackupListResponse>> {
    let backups = state.backups()?;
    let listed = run_blocking(move || backups.list_backups(query.cache.as_deref())).await?;
    Ok(Json(BackupListResponse::new(listed)))
}

/// Handler for DELETE /backups
///
/// Deletes backups older than `?older_than_days=` (default 30).
pub async fn cleanup_backups_handler(
    State(state): State<AppState>,
    Query(query): Query<BackupCleanupQuery>,
) -> Result<Json<CleanupResponse>> {
    let backups = state.backups()?;
    let removed =
        run_blocking(move || backups.cleanup_old_backups(query.older_than_days)).await?;
    Ok(Json(CleanupResponse { removed }))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use serde_json::json;

    fn test_state() -> AppState {
        let store = Arc::new(ExpiringStore::new(StoreConfig::new()));
        AppState::new(Arc::new(CacheHandler::new(store)))
    }

    fn set_request(key: &str, value: serde_json::Value) -> SetRequest {
        SetRequest {
            key: key.to_string(),
            value,
            ttl: None,
        }
    }

    #[tokio::test]
    async fn test_set_and_get_handler() {
        let state = test_state();

        let req = set_request("test_key", json!({"a": 1}));
        let result = set_handler(State(state.clone()), Json(req)).await;
        assert!(result.is_ok());

        let response = get_handler(State(state.clone()), Path("test_key".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_get_nonexistent_key() {
        let state = test_state();

        let result = get_handler(State(state), Path("nonexistent".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = test_state();
        let created = set_handler(State(state.clone()), Json(set_request("to_delete", json!(1))))
            .await
            .unwrap();
        assert_eq!(created.key, "to_delete");

        let result = delete_handler(State(state.clone()), Path("to_delete".to_string())).await;
        assert!(result.is_ok());

        let result = get_handler(State(state), Path("to_delete".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_expire_handler_sets_ttl() {
        let state = test_state();
        state.cache.store().set("session", json!("abc"), None);

        let before = get_handler(State(state.clone()), Path("session".to_string()))
            .await
            .unwrap();
        assert_eq!(before.ttl, None);

        let expired = expire_handler(
            State(state.clone()),
            Path("session".to_string()),
            Json(ExpireRequest { ttl: 120 }),
        )
        .await
        .unwrap();
        assert!(expired.message.contains("120"));

        let after = get_handler(State(state), Path("session".to_string()))
            .await
            .unwrap();
        assert!(matches!(after.ttl, Some(119) | Some(120)));
    }

    #[tokio::test]
    async fn test_expire_handler_missing_key() {
        let state = test_state();
        let result = expire_handler(
            State(state),
            Path("missing".to_string()),
            Json(ExpireRequest { ttl: 10 }),
        )
        .await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_invalid_request() {
        let state = test_state();
        let result = set_handler(State(state), Json(set_request("", json!(1)))).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_create_cache_conflict() {
        let state = test_state();
        let req = CreateCacheRequest {
            name: "users".to_string(),
        };

        let (status, _) = create_cache_handler(State(state.clone()), Json(req.clone()))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let again = create_cache_handler(State(state), Json(req)).await;
        assert!(matches!(again, Err(CacheError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cache_item_round() {
        let state = test_state();
        let path = Path("users".to_string());
        let stored =
            cache_set_handler(State(state.clone()), path, Json(set_request("id:1", json!("alice"))))
                .await
                .unwrap();
        assert_eq!(stored.key, "id:1");

        let got = cache_get_handler(
            State(state.clone()),
            Path(("users".to_string(), "id:1".to_string())),
        )
        .await
        .unwrap();
        assert_eq!(got.value, json!("alice"));

        let stats = cache_stats_handler(State(state), Path("users".to_string()))
            .await
            .unwrap();
        assert_eq!(stats.stats.hits, 1);
    }

    #[tokio::test]
    async fn test_cache_set_over_plain_value_conflicts() {
        let state = test_state();
        state.cache.store().set("plain", json!(1), None);

        let result = cache_set_handler(
            State(state),
            Path("plain".to_string()),
            Json(set_request("k", json!(1))),
        )
        .await;
        assert!(matches!(result, Err(CacheError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_search_missing_cache() {
        let state = test_state();
        let result = search_handler(
            State(state),
            Path("missing".to_string()),
            Query(SearchQuery::default()),
        )
        .await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_backup_without_manager() {
        let state = test_state();
        state.cache.set("users", "k", json!(1), None);

        let result = backup_handler(State(state), Path("users".to_string())).await;
        assert!(matches!(result, Err(CacheError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let state = test_state();
        state.cache.set("users", "k", json!(1), None);
        state.cache.get("users", "missing");

        let response = stats_handler(State(state)).await;
        assert_eq!(response.totals.caches, 1);
        assert_eq!(response.totals.total_misses, 1);
        assert_eq!(response.entries, 1);
    }

    #[tokio::test]
    async fn test_from_config_reloads_backed_up_caches() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            backup_dir: dir.path().to_path_buf(),
            ..Config::default()
        };

        let first = AppState::from_config(&config).unwrap();
        first.cache.set("users", "id:1", json!("alice"), None);
        let stored = backup_handler(State(first.clone()), Path("users".to_string()))
            .await
            .unwrap();
        assert_eq!(stored.cache, "users");

        let second = AppState::from_config(&config).unwrap();
        assert!(second.cache.cache_exists("users"));
        assert_eq!(second.cache.get("users", "id:1"), Some(json!("alice")));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
