//! # Report Repository
//!
//! Read side of reconciliation: loads a rendicion, its documents, its linked
//! solicitudes and their advances, then hands them to
//! [`arendir_core::reconciliation::net`].
//!
//! ## Read Snapshot
//! ```text
//! BEGIN ─┬─ rendicion            ┐
//!        ├─ expense documents    │  one transaction: WAL gives every read
//!        ├─ linked solicitudes   │  the same snapshot, so a concurrent
//!        ├─ advance documents    │  insert is seen by all reads or none
//!        └─ owner + company      ┘
//! COMMIT ──► net() ──► ReconciliationResult (or an error, never a partial)
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use ts_rs::TS;

use super::document::DOCUMENT_SELECT;
use super::ENTRY_COLUMNS;
use crate::error::{DbError, DbResult};
use arendir_core::reconciliation::{net, sum_counted, ReconciliationResult, ReportHeader};
use arendir_core::{AdvancePolicy, Documento, EntryStatus, Money, SequenceEntry, SequenceKind};

/// Filters for [`ReportRepository::list_with_documents`]. All optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WithDocumentsFilter {
    #[serde(alias = "tipo")]
    pub kind: Option<SequenceKind>,
    pub estado: Option<EntryStatus>,
    #[ts(as = "Option<String>")]
    pub fecha_registro_from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub fecha_registro_to: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub fecha_actualizacion_from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub fecha_actualizacion_to: Option<NaiveDate>,
    pub id_user: Option<i64>,
    pub id_empresa: Option<i64>,
}

/// An entry with its documents and their counted total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EntryWithDocuments {
    #[serde(flatten)]
    pub entry: SequenceEntry,
    pub full_name: Option<String>,
    pub documentos: Vec<Documento>,
    /// Non-rejected totals, null as zero.
    #[ts(as = "String")]
    pub total: Money,
}

#[derive(FromRow)]
struct EntryRow {
    #[sqlx(flatten)]
    entry: SequenceEntry,
    full_name: Option<String>,
}

type HeaderRow = (
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Repository for reconciliation and report listings.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Nets a rendicion's expenses against its linked advances.
    ///
    /// ## Errors
    /// - `NotFound` if the rendicion does not exist
    /// - `KindMismatch` if the id is a solicitud
    /// - `NoDocuments` if no expense document counts
    pub async fn reconcile(
        &self,
        rendicion_id: i64,
        policy: AdvancePolicy,
    ) -> DbResult<ReconciliationResult> {
        debug!(rendicion_id, policy = %policy, "Reconciling");

        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {ENTRY_COLUMNS} FROM sequence_entries WHERE id = ?1");
        let rendicion = sqlx::query_as::<_, SequenceEntry>(&sql)
            .bind(rendicion_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Rendicion", rendicion_id))?;

        let expenses = documents_of(&mut tx, rendicion_id).await?;

        let solicitudes: Vec<(i64, String)> = sqlx::query_as(
            r#"
            SELECT e.id, e.nombre
            FROM rendicion_solicitud l
            INNER JOIN sequence_entries e ON e.id = l.solicitud_id
            WHERE l.rendicion_id = ?1
            ORDER BY e.nombre
            "#,
        )
        .bind(rendicion_id)
        .fetch_all(&mut *tx)
        .await?;

        let sql = format!(
            "{DOCUMENT_SELECT} WHERE d.id_numero_rendicion IN \
             (SELECT solicitud_id FROM rendicion_solicitud WHERE rendicion_id = ?1) \
             ORDER BY d.id"
        );
        let advances = sqlx::query_as::<_, Documento>(&sql)
            .bind(rendicion_id)
            .fetch_all(&mut *tx)
            .await?;

        let header: Option<HeaderRow> = sqlx::query_as(
            r#"
            SELECT u.full_name, u.dni, u.cargo, u.ceco, u.gerencia, c.name
            FROM users u
            LEFT JOIN companies c ON c.id = u.id_empresa
            WHERE u.id = ?1
            "#,
        )
        .bind(rendicion.id_user)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        let (full_name, dni, cargo, ceco, gerencia, empresa) =
            header.ok_or_else(|| DbError::not_found("User", rendicion.id_user))?;

        let solicitud_ids: Vec<i64> = solicitudes.iter().map(|(id, _)| *id).collect();
        let netting = net(&rendicion, expenses, &solicitud_ids, advances, policy)?;

        info!(
            rendicion_id,
            code = %rendicion.nombre,
            total_gasto = %netting.totals.total_gasto,
            total_anticipo = %netting.totals.total_anticipo,
            reembolso = %netting.totals.reembolso,
            "Reconciliation computed"
        );

        Ok(ReconciliationResult {
            settlement: netting.totals.settlement(),
            rendicion,
            header: ReportHeader {
                full_name,
                dni,
                cargo,
                ceco,
                gerencia,
                empresa,
            },
            solicitudes: solicitudes.into_iter().map(|(_, code)| code).collect(),
            gastos: netting.gastos,
            anticipos: netting.anticipos,
            totals: netting.totals,
        })
    }

    /// Entries past NUEVO that have at least one document, newest first.
    pub async fn list_with_documents(
        &self,
        filter: &WithDocumentsFilter,
    ) -> DbResult<Vec<EntryWithDocuments>> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            SELECT {ENTRY_COLUMNS},
                (SELECT full_name FROM users WHERE users.id = sequence_entries.id_user) AS full_name
            FROM sequence_entries
            WHERE estado != 'NUEVO'
              AND (?1 IS NULL OR kind = ?1)
              AND (?2 IS NULL OR estado = ?2)
              AND (?3 IS NULL OR fecha_registro >= ?3)
              AND (?4 IS NULL OR fecha_registro <= ?4)
              AND (?5 IS NULL OR fecha_actualizacion >= ?5)
              AND (?6 IS NULL OR fecha_actualizacion <= ?6)
              AND (?7 IS NULL OR id_user = ?7)
              AND (?8 IS NULL OR id_empresa = ?8)
              AND EXISTS (
                  SELECT 1 FROM documentos d WHERE d.id_numero_rendicion = sequence_entries.id
              )
            ORDER BY fecha_registro DESC, id DESC
            "#
        );
        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(filter.kind)
            .bind(filter.estado)
            .bind(filter.fecha_registro_from)
            .bind(filter.fecha_registro_to)
            .bind(filter.fecha_actualizacion_from)
            .bind(filter.fecha_actualizacion_to)
            .bind(filter.id_user)
            .bind(filter.id_empresa)
            .fetch_all(&mut *tx)
            .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let documentos = documents_of(&mut tx, row.entry.id).await?;
            let total = sum_counted(&documentos)?;
            items.push(EntryWithDocuments {
                entry: row.entry,
                full_name: row.full_name,
                documentos,
                total,
            });
        }

        tx.commit().await?;

        debug!(count = items.len(), "Listed entries with documents");
        Ok(items)
    }
}

async fn documents_of(conn: &mut SqliteConnection, entry_id: i64) -> DbResult<Vec<Documento>> {
    let sql = format!("{DOCUMENT_SELECT} WHERE d.id_numero_rendicion = ?1 ORDER BY d.id");
    let docs = sqlx::query_as::<_, Documento>(&sql)
        .bind(entry_id)
        .fetch_all(conn)
        .await?;
    Ok(docs)
}

// =============================================================================
// Unit Tests
// =============================================================================
