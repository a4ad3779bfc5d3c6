//! Rendicion ↔ solicitud link handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ApiResult;
use crate::state::AppState;
use arendir_core::SequenceLink;

/// Link state used when the client sends none.
pub const DEFAULT_LINK_STATE: &str = "ACTIVO";

#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct LinkRequest {
    pub rendicion_id: i64,
    pub solicitud_id: i64,
    #[serde(default)]
    pub estado: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UnlinkQuery {
    pub rendicion_id: i64,
    pub solicitud_id: i64,
}

#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct UnlinkResponse {
    pub removed: bool,
}

/// `POST /rendicion_solicitud`
pub async fn link(
    State(state): State<AppState>,
    Json(request): Json<LinkRequest>,
) -> ApiResult<(StatusCode, Json<SequenceLink>)> {
    let estado = request
        .estado
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_LINK_STATE);

    let link = state
        .db
        .links()
        .link(request.rendicion_id, request.solicitud_id, estado)
        .await?;
    Ok((StatusCode::CREATED, Json(link)))
}

/// `DELETE /rendicion_solicitud?rendicion_id=&solicitud_id=`
pub async fn unlink(
    State(state): State<AppState>,
    Query(query): Query<UnlinkQuery>,
) -> ApiResult<Json<UnlinkResponse>> {
    let removed = state
        .db
        .links()
        .unlink(query.rendicion_id, query.solicitud_id)
        .await?;
    Ok(Json(UnlinkResponse { removed }))
}
