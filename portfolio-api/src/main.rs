use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

mod config;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod storage;

use config::Config;
use services::{Database, TimestampSource};
use shared::observability::{init_logging, LogConfig};
use storage::{ObjectStore, S3Store};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn TimestampSource>,
    pub storage: Arc<dyn ObjectStore>,
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    init_logging(LogConfig {
        level: config.logging.level.clone(),
        format: config.logging.format.parse()?,
        service_name: env!("CARGO_PKG_NAME").to_string(),
        ..Default::default()
    })?;

    info!("Starting Portfolio API v{}", env!("CARGO_PKG_VERSION"));
    debug!(?config, "Configuration loaded");

    let db = Database::new(&config.database);
    let storage = S3Store::new(&config.storage).await;
    info!("Services initialized");

    let addr = config.server.bind_address();
    let state = AppState {
        config: Arc::new(config),
        db: Arc::new(db),
        storage: Arc::new(storage),
    };

    let app = routes::create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Portfolio API listening on http://{}", addr);
    info!("Health check available at http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Portfolio API shut down gracefully");
    Ok(())
}
