mod config;
mod filter;
mod frame;
mod geometry;
mod placement;
mod rate_limit;
mod routes;
mod services;
mod state;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::services::store::{CanvasStore, FileStore, MemoryStore, SnapshotStore};

/// How often idle rate-limit entries are dropped.
const RATE_LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();

    let backend: Arc<dyn SnapshotStore> = if config.uses_memory_store() {
        tracing::warn!("using in-memory store; items are lost on restart");
        Arc::new(MemoryStore::new())
    } else {
        let file = FileStore::new(config.store_path.clone());
        tracing::info!(path = %file.path().display(), "using file store");
        Arc::new(file)
    };

    let jokes = match &config.jokes_path {
        Some(path) => load_jokes(path).await,
        None => Vec::new(),
    };

    let addr = format!("{}:{}", config.bind_addr, config.port);
    let state = state::AppState::new(config, CanvasStore::new(backend), jokes).expect("invalid DENYLIST_EXTRA");

    // Drop addresses that have gone quiet.
    let _sweeper = rate_limit::spawn_sweep_task(state.rate_limiter.clone(), RATE_LIMIT_SWEEP_INTERVAL);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    tracing::info!(%addr, "textwall listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

/// Caption dataset for the bulk read. Non-fatal: a missing or malformed file
/// serves an empty list.
async fn load_jokes(path: &Path) -> Vec<serde_json::Value> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "jokes file unreadable; serving none");
            return Vec::new();
        }
    };
    match serde_json::from_slice::<Vec<serde_json::Value>>(&bytes) {
        Ok(jokes) => {
            tracing::info!(count = jokes.len(), "jokes loaded");
            jokes
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "jokes file is not a JSON array; serving none");
            Vec::new()
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
