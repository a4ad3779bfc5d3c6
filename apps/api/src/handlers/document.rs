//! # Document Handlers
//!
//! Intake, editing, review and removal of expense and advance lines.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;
use ts_rs::TS;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use arendir_core::{DocumentStatus, Documento, NewDocumento};

#[derive(Debug, Deserialize)]
pub struct DocumentsQuery {
    pub id_numero_rendicion: i64,
}

/// Body of `PUT /documentos/{id}/estado`.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct ReviewRequest {
    pub estado: DocumentStatus,
}

/// `POST /documentos/`
pub async fn create(
    State(state): State<AppState>,
    Json(new): Json<NewDocumento>,
) -> ApiResult<(StatusCode, Json<Documento>)> {
    let doc = state.db.documents().create(&new).await?;
    info!(
        id = doc.id,
        numero_rendicion = %doc.numero_rendicion,
        tipo = %doc.tipo_solicitud,
        "Document registered"
    );
    Ok((StatusCode::CREATED, Json(doc)))
}

/// `GET /documentos/{id}`
pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Documento>> {
    state
        .db
        .documents()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Documento", id))
}

/// `GET /documentos/?id_numero_rendicion=`
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<DocumentsQuery>,
) -> ApiResult<Json<Vec<Documento>>> {
    let docs = state
        .db
        .documents()
        .list(query.id_numero_rendicion)
        .await?;
    Ok(Json(docs))
}

/// `PUT /documentos/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(new): Json<NewDocumento>,
) -> ApiResult<Json<Documento>> {
    let doc = state.db.documents().update(id, &new).await?;
    info!(id, numero_rendicion = %doc.numero_rendicion, "Document updated");
    Ok(Json(doc))
}

/// `PUT /documentos/{id}/estado`
pub async fn review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<Json<Documento>> {
    let doc = state.db.documents().review(id, request.estado).await?;
    Ok(Json(doc))
}

/// `DELETE /documentos/{id}`
pub async fn delete(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    state.db.documents().delete(id).await?;
    info!(id, "Document deleted");
    Ok(StatusCode::NO_CONTENT)
}
