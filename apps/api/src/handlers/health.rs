//! Liveness, database reachability and schema state.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;
use arendir_db::migrations::migration_status;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    /// Embedded migrations not yet applied; `None` when the count failed.
    pub pending_migrations: Option<usize>,
    pub version: &'static str,
}

/// `GET /health`: 200 when the database answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let pending_migrations = migration_status(state.db.pool())
        .await
        .ok()
        .map(|(embedded, applied)| embedded.saturating_sub(applied));

    let (status, label) = if database {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label,
            database,
            pending_migrations,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
