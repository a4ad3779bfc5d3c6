//! # Arendir API Server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Arendir API Server                             │
//! │                                                                         │
//! │  Client ───► HTTP (8000) ───► Handlers ───► SQLite (WAL)               │
//! │                                   │                                     │
//! │                                   ├──► ./storage (exported reports)     │
//! │                                   └──► SUNAT (RUC, exchange rate)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use arendir_api::{build_router, AppConfig, AppState};
use arendir_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting Arendir API server...");

    let config = AppConfig::load(None)?;
    info!(
        bind = %config.server.bind_address(),
        database = %config.database.path.display(),
        storage = %config.storage.root.display(),
        advance_policy = %config.reconciliation.advance_policy,
        sunat = config.sunat.base_url.is_some(),
        "Configuration loaded"
    );

    let db_config = DbConfig::new(config.database.path.clone())
        .max_connections(config.database.max_connections)
        .connect_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .busy_timeout(Duration::from_secs(config.database.busy_timeout_secs));
    let db = Database::new(db_config).await?;

    let addr = config.server.bind_address();
    let state = AppState::new(db.clone(), config)?;
    let app = build_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
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
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
