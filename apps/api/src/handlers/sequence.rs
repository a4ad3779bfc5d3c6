//! # Sequence Entry Handlers
//!
//! Allocation of `R00001` / `S00001` codes and the reviewer lifecycle.
//!
//! ## Allocation Flow
//! ```text
//! POST /rendicion/ { id_user: 7 }
//!      │
//!      ▼
//! owner exists? ── no ──► 404
//!      │
//! id_empresa given? ── no ──► owner's company
//!      │  yes, but not the owner's company ──► 400
//!      │
//!      ▼
//! SequenceRepository::next_code ── unique (user, kind, nombre) + retry
//!      │
//!      ▼
//! 201 { id, nombre: "R00003", tipo: "RENDICION", estado: "NUEVO", ... }
//! ```

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info};
use ts_rs::TS;

use crate::error::ApiResult;
use crate::state::AppState;
use arendir_core::{
    CoreError, EntryPatch, EntryStatus, SequenceEntry, SequenceKind, ValidationError,
};

/// Body of `POST /rendicion/` and `POST /solicitud/`.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CreateEntryRequest {
    pub id_user: i64,
    /// Defaults to the user's company; any other company is rejected.
    #[serde(default)]
    pub id_empresa: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LastEntryQuery {
    pub id_user: i64,
    /// `RENDICION` or `ANTICIPO` (`SOLICITUD` accepted).
    pub tipo: String,
}

#[derive(Debug, Deserialize)]
pub struct EntriesQuery {
    #[serde(alias = "user_id")]
    pub id_user: i64,
    #[serde(default)]
    pub estado: Option<EntryStatus>,
}

async fn allocate(
    state: &AppState,
    request: CreateEntryRequest,
    kind: SequenceKind,
) -> ApiResult<(StatusCode, Json<SequenceEntry>)> {
    let owner = state
        .db
        .users()
        .get(request.id_user)
        .await?
        .ok_or(CoreError::InvalidUser(request.id_user))?;

    // 0 reads as "not given", like on documents
    let company_id = match request.id_empresa.filter(|id| *id != 0) {
        Some(id) if id != owner.id_empresa => {
            return Err(CoreError::from(ValidationError::format(
                "id_empresa",
                format!("user {} belongs to company {}", owner.id, owner.id_empresa),
            ))
            .into());
        }
        _ => owner.id_empresa,
    };

    let entry = state
        .db
        .sequences()
        .next_code(request.id_user, company_id, kind)
        .await?;

    info!(
        id = entry.id,
        nombre = %entry.nombre,
        user_id = entry.id_user,
        "Sequence code allocated"
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

/// `POST /rendicion/`
pub async fn create_rendicion(
    State(state): State<AppState>,
    Json(request): Json<CreateEntryRequest>,
) -> ApiResult<(StatusCode, Json<SequenceEntry>)> {
    allocate(&state, request, SequenceKind::Rendicion).await
}

/// `POST /solicitud/`
pub async fn create_solicitud(
    State(state): State<AppState>,
    Json(request): Json<CreateEntryRequest>,
) -> ApiResult<(StatusCode, Json<SequenceEntry>)> {
    allocate(&state, request, SequenceKind::Anticipo).await
}

/// `GET /rendicion/last?id_user=&tipo=`
pub async fn last_entry(
    State(state): State<AppState>,
    Query(query): Query<LastEntryQuery>,
) -> ApiResult<Json<SequenceEntry>> {
    let kind: SequenceKind = query.tipo.parse()?;
    debug!(user_id = query.id_user, kind = %kind, "last_entry");
    let entry = state.db.sequences().last_entry(query.id_user, kind).await?;
    Ok(Json(entry))
}

/// `GET /rendicion/nombres?id_user=&estado=`
pub async fn list_rendiciones(
    State(state): State<AppState>,
    Query(query): Query<EntriesQuery>,
) -> ApiResult<Json<Vec<SequenceEntry>>> {
    let entries = state
        .db
        .sequences()
        .list_entries(query.id_user, SequenceKind::Rendicion, query.estado)
        .await?;
    Ok(Json(entries))
}

/// `GET /solicitud/nombres?id_user=&estado=`
pub async fn list_solicitudes(
    State(state): State<AppState>,
    Query(query): Query<EntriesQuery>,
) -> ApiResult<Json<Vec<SequenceEntry>>> {
    let entries = state
        .db
        .sequences()
        .list_entries(query.id_user, SequenceKind::Anticipo, query.estado)
        .await?;
    Ok(Json(entries))
}

async fn update(
    state: &AppState,
    id: i64,
    kind: SequenceKind,
    patch: EntryPatch,
) -> ApiResult<Json<SequenceEntry>> {
    // A solicitud id on a rendicion route is a KindMismatch
    state.db.sequences().require(id, kind).await?;
    let entry = state.db.sequences().update_entry(id, &patch).await?;
    info!(id, nombre = %entry.nombre, estado = %entry.estado, "Entry updated");
    Ok(Json(entry))
}

/// `PUT /rendicion/{id}`
pub async fn update_rendicion(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<EntryPatch>,
) -> ApiResult<Json<SequenceEntry>> {
    update(&state, id, SequenceKind::Rendicion, patch).await
}

/// `PUT /solicitud/{id}`
pub async fn update_solicitud(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<EntryPatch>,
) -> ApiResult<Json<SequenceEntry>> {
    update(&state, id, SequenceKind::Anticipo, patch).await
}
