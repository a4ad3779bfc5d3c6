//! # Lookup Handlers
//!
//! Helpers for filling in the document form: QR classification (local) and
//! SUNAT lookups (remote, read-only).

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;
use ts_rs::TS;

use crate::error::ApiResult;
use crate::integrations::sunat::{ExchangeRateQuote, RucInfo};
use crate::state::AppState;
use arendir_core::qr::{parse_qr, QrFields};

/// Body of `POST /process-qr/`: the raw text decoded from the receipt QR.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct QrRequest {
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeRateQuery {
    pub fecha: NaiveDate,
}

/// `POST /process-qr/`
pub async fn process_qr(Json(request): Json<QrRequest>) -> Json<QrFields> {
    let fields = parse_qr(&request.data);
    debug!(ruc = ?fields.ruc, serie = ?fields.serie, total = ?fields.total, "QR classified");
    Json(fields)
}

/// `GET /consulta/ruc/{ruc}`
pub async fn ruc(
    State(state): State<AppState>,
    Path(ruc): Path<String>,
) -> ApiResult<Json<RucInfo>> {
    let info = state.sunat()?.lookup_ruc(&ruc).await?;
    Ok(Json(info))
}

/// `GET /consulta/tipo-cambio?fecha=YYYY-MM-DD`
pub async fn exchange_rate(
    State(state): State<AppState>,
    Query(query): Query<ExchangeRateQuery>,
) -> ApiResult<Json<ExchangeRateQuote>> {
    let quote = state.sunat()?.exchange_rate(query.fecha).await?;
    Ok(Json(quote))
}
