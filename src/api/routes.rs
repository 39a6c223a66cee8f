//! API Routes
//!
//! Configures the Axum router with all cache server endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    backup_handler, cache_clear_handler, cache_delete_handler, cache_get_handler,
    cache_items_handler, cache_set_handler, cache_stats_handler, cleanup_backups_handler,
    clear_handler, create_cache_handler, delete_cache_handler, delete_handler, expire_handler,
    find_handler,
    get_handler, health_handler, keys_handler, list_backups_handler, list_caches_handler,
    reset_stats_handler, restore_handler, search_handler, set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Default store
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/expire/:key", put(expire_handler))
        .route("/keys", get(keys_handler))
        .route("/clear", delete(clear_handler))
        // Named caches
        .route("/caches", get(list_caches_handler).post(create_cache_handler))
        .route("/caches/:name", delete(delete_cache_handler))
        .route(
            "/caches/:name/items",
            put(cache_set_handler)
                .get(cache_items_handler)
                .delete(cache_clear_handler),
        )
        .route(
            "/caches/:name/items/:key",
            get(cache_get_handler).delete(cache_delete_handler),
        )
        .route("/caches/:name/search", get(search_handler))
        .route("/caches/:name/find", post(find_handler))
        .route(
            "/caches/:name/stats",
            get(cache_stats_handler).delete(reset_stats_handler),
        )
        .route("/stats", get(stats_handler))
        // Backups
        .route("/caches/:name/backup", post(backup_handler))
        .route("/backups", get(list_backups_handler).delete(cleanup_backups_handler))
        .route("/backups/restore", post(restore_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
