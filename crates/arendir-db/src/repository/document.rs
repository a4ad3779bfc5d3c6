//! # Document Repository
//!
//! Expense and advance line items.
//!
//! ## Intake Checks
//! ```text
//! NewDocumento (create or update)
//!     │
//!     ├── field formats (RUC, serie, correlativo, DNI, moneda, amounts)
//!     │
//!     │   BEGIN IMMEDIATE
//!     ├── owning entry exists and belongs to id_user
//!     ├── tipo_solicitud fits the entry kind
//!     │     GASTO / RENDICION ──► R entries
//!     │     ANTICIPO          ──► S entries
//!     ├── derived amounts (total from importe_facturado × tc, sub_total)
//!     ├── duplicate guard: (id_empresa, fecha_emision, serie, correlativo, total)
//!     └── INSERT / UPDATE documentos
//!         COMMIT
//! ```
//!
//! The guard and the write share one write transaction, so two identical
//! submissions cannot both pass the check. The guard compares NULL dates
//! and totals as equal; `idx_documentos_identity` indexes the same
//! COALESCEd columns and backs it up.
//!
//! `numero_rendicion` and `empresa` on a [`Documento`] come from joins and
//! are never written.

use chrono::{NaiveDate, Utc};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use super::ENTRY_COLUMNS;
use crate::error::{DbError, DbResult};
use arendir_core::validation::{validate_amount, validate_moneda, validate_new_documento};
use arendir_core::{
    CoreError, DocumentStatus, Documento, Money, NewDocumento, SequenceEntry, SequenceKind,
    TipoSolicitud, ValidationError,
};

/// SELECT list and joins shared by every `Documento` query.
pub(crate) const DOCUMENT_SELECT: &str = r#"
    SELECT
        d.id, d.id_user, d.id_empresa, d.id_numero_rendicion, d.tipo_solicitud, d.estado,
        d.fecha_solicitud, d.fecha_emision, d.fecha_rendicion,
        d.dni, d.usuario, d.gerencia, d.ruc, d.proveedor, d.tipo_documento,
        d.serie, d.correlativo, d.tipo_gasto, d.rubro, d.cuenta_contable,
        d.motivo, d.origen, d.destino, d.detalle, d.archivo,
        d.moneda, d.tipo_cambio,
        d.sub_total_cents, d.igv_cents, d.no_gravadas_cents,
        d.importe_facturado_cents, d.total_cents,
        e.nombre AS numero_rendicion,
        c.name AS empresa
    FROM documentos d
    INNER JOIN sequence_entries e ON e.id = d.id_numero_rendicion
    LEFT JOIN companies c ON c.id = d.id_empresa
"#;

/// Repository for documents.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    /// Creates a new DocumentRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    /// Validates and stores a document.
    ///
    /// ## Errors
    /// - `Validation` for malformed fields
    /// - `NotFound` if the owning entry does not exist
    /// - `OwnershipMismatch` if the entry belongs to another user
    /// - `KindMismatch` if `tipo_solicitud` does not fit the entry
    /// - `DuplicateDocument` on a double submission
    pub async fn create(&self, new: &NewDocumento) -> DbResult<Documento> {
        validate_new_documento(new).map_err(CoreError::from)?;

        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;
        let prepared = prepare(&mut tx, new).await?;
        ensure_not_registered(&mut tx, &prepared, new.fecha_emision, None).await?;

        debug!(
            entry_id = prepared.entry.id,
            tipo = %prepared.tipo,
            total = ?prepared.total.map(|t| t.to_string()),
            "Creating document"
        );

        let query = sqlx::query(
            r#"
            INSERT INTO documentos (
                id_user, id_empresa, id_numero_rendicion, tipo_solicitud, estado,
                fecha_solicitud, fecha_emision,
                dni, usuario, gerencia, ruc, proveedor, tipo_documento,
                serie, correlativo, tipo_gasto, rubro, cuenta_contable,
                motivo, origen, destino, detalle, archivo,
                moneda, tipo_cambio,
                sub_total_cents, igv_cents, no_gravadas_cents,
                importe_facturado_cents, total_cents
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7,
                ?8, ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18,
                ?19, ?20, ?21, ?22, ?23,
                ?24, ?25,
                ?26, ?27, ?28,
                ?29, ?30
            )
            "#,
        );
        let estado = new.estado.unwrap_or_default();
        let result = bind_fields(query, &prepared, new, estado)
            .execute(&mut *tx)
            .await
            .map_err(|e| as_duplicate(e, &prepared))?;
        tx.commit().await?;

        let id = result.last_insert_rowid();
        info!(document_id = id, entry_id = prepared.entry.id, "Document created");

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Documento", id))
    }

    /// Replaces every editable field of a document.
    ///
    /// Runs the same checks as [`create`](Self::create). The duplicate guard
    /// ignores the document itself. An absent `estado` keeps the current one;
    /// `fecha_rendicion` is left untouched.
    ///
    /// ## Errors
    /// - `NotFound` if the document (or its new owning entry) does not exist
    /// - everything [`create`](Self::create) returns
    pub async fn update(&self, id: i64, new: &NewDocumento) -> DbResult<Documento> {
        validate_new_documento(new).map_err(CoreError::from)?;

        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let current: Option<DocumentStatus> =
            sqlx::query_scalar("SELECT estado FROM documentos WHERE id = ?1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let current = current.ok_or_else(|| DbError::not_found("Documento", id))?;

        let prepared = prepare(&mut tx, new).await?;
        ensure_not_registered(&mut tx, &prepared, new.fecha_emision, Some(id)).await?;

        let query = sqlx::query(
            r#"
            UPDATE documentos SET
                id_user = ?1, id_empresa = ?2, id_numero_rendicion = ?3,
                tipo_solicitud = ?4, estado = ?5,
                fecha_solicitud = ?6, fecha_emision = ?7,
                dni = ?8, usuario = ?9, gerencia = ?10, ruc = ?11, proveedor = ?12,
                tipo_documento = ?13, serie = ?14, correlativo = ?15, tipo_gasto = ?16,
                rubro = ?17, cuenta_contable = ?18, motivo = ?19, origen = ?20,
                destino = ?21, detalle = ?22, archivo = ?23,
                moneda = ?24, tipo_cambio = ?25,
                sub_total_cents = ?26, igv_cents = ?27, no_gravadas_cents = ?28,
                importe_facturado_cents = ?29, total_cents = ?30
            WHERE id = ?31
            "#,
        );
        let estado = new.estado.unwrap_or(current);
        bind_fields(query, &prepared, new, estado)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| as_duplicate(e, &prepared))?;
        tx.commit().await?;

        info!(document_id = id, entry_id = prepared.entry.id, "Document updated");

        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Documento", id))
    }

    /// Gets a document by id.
    pub async fn get(&self, id: i64) -> DbResult<Option<Documento>> {
        let sql = format!("{DOCUMENT_SELECT} WHERE d.id = ?1");
        let doc = sqlx::query_as::<_, Documento>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(doc)
    }

    /// Documents attached to one entry, in submission order.
    pub async fn list(&self, id_numero_rendicion: i64) -> DbResult<Vec<Documento>> {
        let sql = format!("{DOCUMENT_SELECT} WHERE d.id_numero_rendicion = ?1 ORDER BY d.id");
        let docs = sqlx::query_as::<_, Documento>(&sql)
            .bind(id_numero_rendicion)
            .fetch_all(&self.pool)
            .await?;
        Ok(docs)
    }

    /// Sets the review state and stamps `fecha_rendicion` with today.
    pub async fn review(&self, id: i64, estado: DocumentStatus) -> DbResult<Documento> {
        let result = sqlx::query(
            "UPDATE documentos SET estado = ?2, fecha_rendicion = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(estado)
        .bind(Utc::now().date_naive())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Documento", id));
        }

        info!(document_id = id, estado = %estado, "Document reviewed");
        self.get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Documento", id))
    }

    /// Hard delete, for administrators.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM documentos WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Documento", id));
        }

        info!(document_id = id, "Document deleted");
        Ok(())
    }
}

// =============================================================================
// Write Path
// =============================================================================

/// A submission checked against its owning entry, ready to be written.
struct Prepared {
    entry: SequenceEntry,
    tipo: TipoSolicitud,
    moneda: String,
    serie: Option<String>,
    correlativo: Option<String>,
    total: Option<Money>,
    sub_total: Option<Money>,
}

/// Resolves the owning entry and derives what the form left out.
async fn prepare(conn: &mut SqliteConnection, new: &NewDocumento) -> DbResult<Prepared> {
    let moneda = match clean(&new.moneda) {
        Some(m) => validate_moneda(&m).map_err(CoreError::from)?,
        None => "PEN".to_string(),
    };

    let sql = format!("SELECT {ENTRY_COLUMNS} FROM sequence_entries WHERE id = ?1");
    let entry = sqlx::query_as::<_, SequenceEntry>(&sql)
        .bind(new.id_numero_rendicion)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("SequenceEntry", new.id_numero_rendicion))?;

    if entry.id_user != new.id_user {
        return Err(CoreError::OwnershipMismatch {
            entity: entry.kind.entity(),
            id: entry.id,
            user_id: new.id_user,
        }
        .into());
    }

    if new.id_empresa != 0 && new.id_empresa != entry.id_empresa {
        return Err(CoreError::from(ValidationError::format(
            "id_empresa",
            "does not match the owning entry",
        ))
        .into());
    }

    let tipo = new.tipo_solicitud.unwrap_or(match entry.kind {
        SequenceKind::Rendicion => TipoSolicitud::Rendicion,
        SequenceKind::Anticipo => TipoSolicitud::Anticipo,
    });
    if tipo.owning_kind() != entry.kind {
        return Err(CoreError::KindMismatch {
            id: entry.id,
            expected: tipo.owning_kind(),
            actual: entry.kind,
        }
        .into());
    }

    let (total, sub_total) = derive_amounts(new).map_err(CoreError::from)?;

    Ok(Prepared {
        entry,
        tipo,
        moneda,
        serie: clean(&new.serie).map(|s| s.to_uppercase()),
        correlativo: clean(&new.correlativo),
        total,
        sub_total,
    })
}

/// Rejects a submission whose identity is already on file for the company.
///
/// Only documents with both serie and correlativo are guarded. `exclude` is
/// the document being edited.
async fn ensure_not_registered(
    conn: &mut SqliteConnection,
    prepared: &Prepared,
    fecha_emision: Option<NaiveDate>,
    exclude: Option<i64>,
) -> DbResult<()> {
    let (Some(serie), Some(correlativo)) = (&prepared.serie, &prepared.correlativo) else {
        return Ok(());
    };

    // IS compares NULLs as equal, matching the COALESCEd unique index
    let existing: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM documentos
        WHERE id_empresa = ?1
          AND fecha_emision IS ?2
          AND serie = ?3
          AND correlativo = ?4
          AND total_cents IS ?5
          AND (?6 IS NULL OR id <> ?6)
        LIMIT 1
        "#,
    )
    .bind(prepared.entry.id_empresa)
    .bind(fecha_emision)
    .bind(serie)
    .bind(correlativo)
    .bind(prepared.total)
    .bind(exclude)
    .fetch_optional(conn)
    .await?;

    match existing {
        Some(id) => {
            debug!(
                existing_id = id,
                serie = %serie,
                correlativo = %correlativo,
                "Duplicate document"
            );
            Err(CoreError::DuplicateDocument {
                serie: serie.clone(),
                correlativo: correlativo.clone(),
            }
            .into())
        }
        None => Ok(()),
    }
}

/// Binds `?1..=?30` in the column order shared by INSERT and UPDATE.
fn bind_fields<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    prepared: &'q Prepared,
    new: &'q NewDocumento,
    estado: DocumentStatus,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(prepared.entry.id_user)
        .bind(prepared.entry.id_empresa)
        .bind(prepared.entry.id)
        .bind(prepared.tipo)
        .bind(estado)
        .bind(new.fecha_solicitud)
        .bind(new.fecha_emision)
        .bind(clean(&new.dni))
        .bind(clean(&new.usuario))
        .bind(clean(&new.gerencia))
        .bind(clean(&new.ruc))
        .bind(clean(&new.proveedor))
        .bind(clean(&new.tipo_documento))
        .bind(&prepared.serie)
        .bind(&prepared.correlativo)
        .bind(clean(&new.tipo_gasto))
        .bind(clean(&new.rubro))
        .bind(clean(&new.cuenta_contable))
        .bind(clean(&new.motivo))
        .bind(clean(&new.origen))
        .bind(clean(&new.destino))
        .bind(clean(&new.detalle))
        .bind(clean(&new.archivo))
        .bind(&prepared.moneda)
        .bind(new.tipo_cambio)
        .bind(prepared.sub_total)
        .bind(new.igv)
        .bind(new.no_gravadas)
        .bind(new.importe_facturado)
        .bind(prepared.total)
}

/// The unique index only fires when the guard was bypassed; report it the same way.
fn as_duplicate(err: sqlx::Error, prepared: &Prepared) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::Domain(CoreError::DuplicateDocument {
            serie: prepared.serie.clone().unwrap_or_default(),
            correlativo: prepared.correlativo.clone().unwrap_or_default(),
        }),
        other => other,
    }
}

/// Trims and drops blank strings.
fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Fills `total` and `sub_total` when the form left them out.
///
/// - total = importe_facturado × tipo_cambio (foreign-currency invoices)
/// - sub_total = total − igv
///
/// A converted total goes through the same cap as a typed one.
fn derive_amounts(new: &NewDocumento) -> Result<(Option<Money>, Option<Money>), ValidationError> {
    let total = match (new.total, new.importe_facturado, new.tipo_cambio) {
        (Some(total), _, _) => Some(total),
        (None, Some(importe), Some(tc)) => {
            let converted = importe.convert(tc)?;
            validate_amount("total", Some(converted))?;
            Some(converted)
        }
        _ => None,
    };

    // Both sides are capped and non-negative, so the difference fits
    let sub_total = new.sub_total.or_else(|| match (total, new.igv) {
        (Some(total), Some(igv)) => Some(total - igv),
        _ => None,
    });

    Ok((total, sub_total))
}

// =============================================================================
// Unit Tests
// =============================================================================
