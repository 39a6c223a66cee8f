//! Radish - An in-memory TTL key-value store with named caches
//!
//! Serves the store over HTTP, sweeps expired entries and backs up named
//! caches in the background.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use radish::api::create_router;
use radish::{spawn_backup_task, AppState, Config};

/// Main entry point for the Radish cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build store, backup manager and cache handler
/// 4. Start the TTL sweep and the auto-backup task
/// 5. Serve the HTTP API on the configured port
/// 6. On SIGINT/SIGTERM: stop auto-backup, write a final backup, stop the sweep
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "radish=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Radish cache server");

    let config = Config::from_env();
    info!(
        "Configuration loaded: store={}, default_ttl={:?}, port={}, cleanup_interval={}s, backup_dir={}, auto_backup_interval={}s",
        config.store_name,
        config.default_ttl,
        config.server_port,
        config.cleanup_interval,
        config.backup_dir.display(),
        config.auto_backup_interval
    );

    let state = AppState::from_config(&config).context("Failed to initialize cache")?;
    let cache = Arc::clone(&state.cache);

    cache.store().start_sweeper();
    info!("Background sweep started");

    let backup_task = (config.auto_backup_interval > 0).then(|| {
        spawn_backup_task(
            Arc::downgrade(&cache),
            Duration::from_secs(config.auto_backup_interval),
        )
    });

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(task) = backup_task {
        task.shutdown().await;
    }
    cache.stop().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
