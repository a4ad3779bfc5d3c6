//! # Reconciliation and Export Handlers
//!
//! ## Export Flow
//! ```text
//! GET /documentos/export/excel?id_rendicion=12&id_usuario=7
//!      │
//!      ▼
//! rendicion 12 owned by user 7? ── no ──► 400 OwnershipMismatch
//!      │
//!      ▼
//! ReportRepository::reconcile (one read snapshot, all or nothing)
//!      │
//!      ▼
//! RendererRegistry[excel].render ──► ObjectStorage::put(random name)
//!      │
//!      ▼
//! 200 { url, total_gasto, total_anticipo, reembolso, settlement }
//! ```

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use ts_rs::TS;

use crate::error::ApiResult;
use crate::integrations::export::ExportFormat;
use crate::integrations::storage::unique_name;
use crate::state::AppState;
use arendir_core::reconciliation::ReconciliationResult;
use arendir_core::{CoreError, SequenceKind, Settlement, Totals};
use arendir_db::{EntryWithDocuments, WithDocumentsFilter};

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub id_rendicion: i64,
    pub id_usuario: i64,
}

/// Where the exported file landed, plus the figures printed on it.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct ExportResponse {
    pub url: String,
    pub nombre: String,
    #[serde(flatten)]
    pub totals: Totals,
    pub settlement: Settlement,
}

/// `GET /rendicion/{id}/reconciliation`
pub async fn reconciliation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ReconciliationResult>> {
    let result = state.db.reports().reconcile(id, state.advance_policy()).await?;
    Ok(Json(result))
}

async fn export(
    state: &AppState,
    query: ExportQuery,
    format: ExportFormat,
) -> ApiResult<Json<ExportResponse>> {
    let rendicion = state
        .db
        .sequences()
        .require(query.id_rendicion, SequenceKind::Rendicion)
        .await?;
    if rendicion.id_user != query.id_usuario {
        return Err(CoreError::OwnershipMismatch {
            entity: "Rendicion",
            id: rendicion.id,
            user_id: query.id_usuario,
        }
        .into());
    }

    let renderer = state.renderers.get(format)?;
    let result = state
        .db
        .reports()
        .reconcile(rendicion.id, state.advance_policy())
        .await?;

    let rendered = renderer.render(&result)?;
    let name = unique_name(&format!("rendicion_{}", result.rendicion.nombre), rendered.extension);
    let url = state
        .storage
        .put(&name, rendered.bytes, rendered.content_type)
        .await?;

    info!(
        rendicion = %result.rendicion.nombre,
        format = %format,
        url = %url,
        reembolso = %result.totals.reembolso,
        "Report exported"
    );

    Ok(Json(ExportResponse {
        url,
        nombre: result.rendicion.nombre,
        totals: result.totals,
        settlement: result.settlement,
    }))
}

/// `GET /documentos/export/pdf`
pub async fn export_pdf(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Json<ExportResponse>> {
    export(&state, query, ExportFormat::Pdf).await
}

/// `GET /documentos/export/excel`
pub async fn export_excel(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> ApiResult<Json<ExportResponse>> {
    export(&state, query, ExportFormat::Excel).await
}

/// `GET /rendiciones-solicitudes/con-documentos/`
pub async fn with_documents(
    State(state): State<AppState>,
    Query(filter): Query<WithDocumentsFilter>,
) -> ApiResult<Json<Vec<EntryWithDocuments>>> {
    let entries = state.db.reports().list_with_documents(&filter).await?;
    Ok(Json(entries))
}
