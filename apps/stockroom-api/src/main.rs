//! # Stockroom API
//!
//! HTTP server for inventory tracking with an append-only audit history.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom API Server                             │
//! │                                                                         │
//! │  Client ───► HTTP (8000) ───► Routes ───► stockroom-db ───► SQLite     │
//! │                                                  │                      │
//! │                                                  ▼                      │
//! │                                          Snapshot exporter              │
//! │                                          (EXPORT_DIR, optional)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use stockroom_api::export::SnapshotExporter;
use stockroom_api::{bootstrap_admin, router, ApiConfig, AppState};
use stockroom_db::{Database, DbConfig};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting Stockroom API server...");

    // Load configuration
    let config = ApiConfig::load().context("Invalid configuration")?;
    info!(
        port = config.http_port,
        database = %config.database_path.display(),
        utc_offset = %config.display_offset,
        "Configuration loaded"
    );

    // Open database (migrations run on connect)
    let db = Database::new(DbConfig::new(&config.database_path))
        .await
        .context("Failed to open database")?;
    info!("Database ready");

    if let Some(admin) = &config.admin {
        bootstrap_admin(&db, admin)
            .await
            .context("Failed to create the admin account")?;
    }

    // Snapshot export (optional)
    let exporter = config.export_dir.clone().map(|dir| {
        let (exporter, handle) = SnapshotExporter::new(db.clone(), dir, config.export_interval);
        tokio::spawn(exporter.run());
        handle
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = Arc::new(AppState::new(db.clone(), config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    if let Some(handle) = exporter {
        handle.shutdown().await;
    }
    db.close().await;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
