//! Store health check.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use stockroom_db::MigrationStatus;
use tracing::warn;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health/", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub migrations: Option<MigrationStatus>,
    pub version: &'static str,
}

/// 200 when the database answers and its schema is current, 503 otherwise.
async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;

    let migrations = if database {
        match state.db.migration_status().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(error = %e, "Could not read migration status");
                None
            }
        }
    } else {
        None
    };

    let healthy = database && migrations.map_or(false, |m| m.is_current());
    let (status, label) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        status,
        Json(HealthResponse {
            status: label,
            database,
            migrations,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
