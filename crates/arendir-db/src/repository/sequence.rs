//! # Sequence Repository
//!
//! Allocation of per-user codes (`R00001`, `S00001`) and the lifecycle of
//! the entries that carry them.
//!
//! ## Allocation Under Concurrency
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │          Two requests for the same (user 7, RENDICION)                  │
//! │                                                                         │
//! │  Request A                           Request B                          │
//! │  BEGIN IMMEDIATE ──► write lock      BEGIN IMMEDIATE ──► waits (busy)   │
//! │  latest = R00004                          │                             │
//! │  INSERT R00005                            │                             │
//! │  COMMIT ─────────────────────────────────►│ lock granted                │
//! │                                      latest = R00005                    │
//! │                                      INSERT R00006, COMMIT              │
//! │                                                                         │
//! │  The read and the insert share one write transaction, so allocations    │
//! │  for a user queue up instead of racing. UNIQUE (id_user, kind, nombre)  │
//! │  stays as the last line: a violation is retried a few times.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Waiting for the lock is bounded by the pool's busy timeout; a request
//! that times out gets `Conflict` and may simply be retried by the client.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use super::ENTRY_COLUMNS;
use crate::error::{DbError, DbResult};
use arendir_core::{CoreError, EntryPatch, EntryStatus, SequenceCode, SequenceEntry, SequenceKind};

/// Attempts per allocation when the unique index still reports a clash.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 3;

/// Repository for rendicion / solicitud entries.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    pool: SqlitePool,
}

impl SequenceRepository {
    /// Creates a new SequenceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SequenceRepository { pool }
    }

    /// Allocates the next code for `(user_id, kind)` and persists the entry.
    ///
    /// ## What This Does
    /// 1. Checks the user exists
    /// 2. Opens a write transaction (`BEGIN IMMEDIATE`)
    /// 3. Reads the highest code of that user and kind
    /// 4. Inserts the successor with estado NUEVO and today's date, commits
    ///
    /// ## Errors
    /// - `InvalidUser` if the user does not exist
    /// - `SequenceExhausted` after `R99999` / `S99999`
    /// - `Conflict` if the write lock could not be obtained in time
    pub async fn next_code(
        &self,
        user_id: i64,
        company_id: i64,
        kind: SequenceKind,
    ) -> DbResult<SequenceEntry> {
        if !self.user_exists(user_id).await? {
            return Err(CoreError::InvalidUser(user_id).into());
        }

        for attempt in 1..=MAX_ALLOCATION_ATTEMPTS {
            match self.allocate(user_id, company_id, kind, attempt).await {
                Ok(entry) => {
                    info!(
                        user_id,
                        entry_id = entry.id,
                        code = %entry.nombre,
                        "Sequence entry created"
                    );
                    return Ok(entry);
                }
                Err(err) if err.is_unique_violation() => {
                    warn!(
                        user_id,
                        kind = %kind,
                        attempt,
                        "Code taken outside the allocator, retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(DbError::Conflict(format!(
            "no free {kind} code for user {user_id} after {MAX_ALLOCATION_ATTEMPTS} attempts"
        )))
    }

    async fn allocate(
        &self,
        user_id: i64,
        company_id: i64,
        kind: SequenceKind,
        attempt: u32,
    ) -> DbResult<SequenceEntry> {
        // IMMEDIATE takes the write lock before the read, so the read cannot go stale.
        let mut tx = self.pool.begin_with("BEGIN IMMEDIATE").await?;

        let latest = latest_code(&mut *tx, user_id, kind).await?;
        let code = SequenceCode::after(kind, latest.as_deref())?;
        debug!(user_id, kind = %kind, code = %code, attempt, "Allocating sequence code");

        let entry = insert_entry(&mut *tx, user_id, company_id, &code).await?;
        tx.commit().await?;
        Ok(entry)
    }

    async fn user_exists(&self, user_id: i64) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Gets an entry by id.
    pub async fn get(&self, id: i64) -> DbResult<Option<SequenceEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM sequence_entries WHERE id = ?1");
        let entry = sqlx::query_as::<_, SequenceEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    /// Gets an entry that must exist and be of `kind`.
    ///
    /// ## Errors
    /// - `NotFound` (named after the kind) if absent
    /// - `KindMismatch` if it is the other kind
    pub async fn require(&self, id: i64, kind: SequenceKind) -> DbResult<SequenceEntry> {
        let entry = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found(kind.entity(), id))?;

        if entry.kind != kind {
            return Err(CoreError::KindMismatch {
                id,
                expected: kind,
                actual: entry.kind,
            }
            .into());
        }
        Ok(entry)
    }

    /// Most recent entry of a user and kind.
    pub async fn last_entry(&self, user_id: i64, kind: SequenceKind) -> DbResult<SequenceEntry> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM sequence_entries \
             WHERE id_user = ?1 AND kind = ?2 ORDER BY nombre DESC LIMIT 1"
        );
        sqlx::query_as::<_, SequenceEntry>(&sql)
            .bind(user_id)
            .bind(kind)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::not_found(kind.entity(), format!("latest for user {user_id}")))
    }

    /// Entries of a user and kind in code order, optionally in one state.
    pub async fn list_entries(
        &self,
        user_id: i64,
        kind: SequenceKind,
        estado: Option<EntryStatus>,
    ) -> DbResult<Vec<SequenceEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM sequence_entries \
             WHERE id_user = ?1 AND kind = ?2 AND (?3 IS NULL OR estado = ?3) \
             ORDER BY nombre"
        );
        let entries = sqlx::query_as::<_, SequenceEntry>(&sql)
            .bind(user_id)
            .bind(kind)
            .bind(estado)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    /// Applies a reviewer patch.
    ///
    /// ## Rules
    /// - `estado` must follow [`EntryStatus::can_transition_to`]
    /// - Absent fields keep their value; `nombre` and `kind` never change
    /// - `fecha_actualizacion` becomes today
    /// - The write only lands if the state is still the one that was checked,
    ///   so two reviewers cannot both move the same entry
    ///
    /// ## Errors
    /// - `NotFound`, `InvalidTransition`, `Conflict` (concurrent review)
    pub async fn update_entry(&self, id: i64, patch: &EntryPatch) -> DbResult<SequenceEntry> {
        let current = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("SequenceEntry", id))?;

        if patch.is_empty() {
            return Ok(current);
        }

        let next = patch.estado.unwrap_or(current.estado);
        if !current.estado.can_transition_to(next, current.kind) {
            return Err(CoreError::InvalidTransition {
                kind: current.kind,
                from: current.estado,
                to: next,
            }
            .into());
        }

        debug!(entry_id = id, from = %current.estado, to = %next, "Updating sequence entry");

        let sql = format!(
            r#"
            UPDATE sequence_entries SET
                estado = ?2,
                id_aprobador = COALESCE(?3, id_aprobador),
                nom_aprobador = COALESCE(?4, nom_aprobador),
                id_contador = COALESCE(?5, id_contador),
                nom_contador = COALESCE(?6, nom_contador),
                fecha_actualizacion = ?7
            WHERE id = ?1 AND estado = ?8
            RETURNING {ENTRY_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, SequenceEntry>(&sql)
            .bind(id)
            .bind(next)
            .bind(patch.id_aprobador)
            .bind(&patch.nom_aprobador)
            .bind(patch.id_contador)
            .bind(&patch.nom_contador)
            .bind(Utc::now().date_naive())
            .bind(current.estado)
            .fetch_optional(&self.pool)
            .await?;

        updated.ok_or_else(|| DbError::Conflict(format!("entry {id} changed while being updated")))
    }
}

/// Highest code for the pair. Fixed width makes text order numeric order.
async fn latest_code(
    conn: &mut SqliteConnection,
    user_id: i64,
    kind: SequenceKind,
) -> DbResult<Option<String>> {
    let latest = sqlx::query_scalar(
        r#"
        SELECT nombre FROM sequence_entries
        WHERE id_user = ?1 AND kind = ?2
        ORDER BY nombre DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(kind)
    .fetch_optional(conn)
    .await?;
    Ok(latest)
}

async fn insert_entry(
    conn: &mut SqliteConnection,
    user_id: i64,
    company_id: i64,
    code: &SequenceCode,
) -> DbResult<SequenceEntry> {
    let sql = format!(
        "INSERT INTO sequence_entries (id_user, id_empresa, nombre, kind, estado, fecha_registro) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) RETURNING {ENTRY_COLUMNS}"
    );
    let entry = sqlx::query_as::<_, SequenceEntry>(&sql)
        .bind(user_id)
        .bind(company_id)
        .bind(code.to_string())
        .bind(code.kind())
        .bind(EntryStatus::Nuevo)
        .bind(Utc::now().date_naive())
        .fetch_one(conn)
        .await?;
    Ok(entry)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{memory_db, user};
    use crate::{Database, DbConfig};
    use arendir_core::{ErrorKind, DEFAULT_COMPANY_ID};
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_sequential_codes_have_no_gaps() {
        let db = memory_db().await;
        let ana = user(&db, "ana@empresa.pe").await;
        let repo = db.sequences();

        let mut codes = Vec::new();
        for _ in 0..5 {
            let entry = repo
                .next_code(ana.id, DEFAULT_COMPANY_ID, SequenceKind::Rendicion)
                .await
                .unwrap();
            assert_eq!(entry.estado, EntryStatus::Nuevo);
            assert_eq!(entry.fecha_registro, Utc::now().date_naive());
            codes.push(entry.nombre);
        }

        assert_eq!(codes, vec!["R00001", "R00002", "R00003", "R00004", "R00005"]);
    }

    #[tokio::test]
    async fn test_kinds_and_users_are_independent() {
        let db = memory_db().await;
        let ana = user(&db, "ana@empresa.pe").await;
        let luis = user(&db, "luis@empresa.pe").await;
        let repo = db.sequences();

        repo.next_code(ana.id, DEFAULT_COMPANY_ID, SequenceKind::Rendicion)
            .await
            .unwrap();
        let s = repo
            .next_code(ana.id, DEFAULT_COMPANY_ID, SequenceKind::Anticipo)
            .await
            .unwrap();
        let r = repo
            .next_code(luis.id, DEFAULT_COMPANY_ID, SequenceKind::Rendicion)
            .await
            .unwrap();

        assert_eq!(s.nombre, "S00001");
        assert_eq!(s.kind, SequenceKind::Anticipo);
        assert_eq!(r.nombre, "R00001");
    }

    #[tokio::test]
    async fn test_unknown_user_is_rejected() {
        let db = memory_db().await;
        let err = db
            .sequences()
            .next_code(999, DEFAULT_COMPANY_ID, SequenceKind::Rendicion)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Domain(CoreError::InvalidUser(999))));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_exhausted_sequence() {
        let db = memory_db().await;
        let ana = user(&db, "ana@empresa.pe").await;

        sqlx::query(
            "INSERT INTO sequence_entries (id_user, id_empresa, nombre, kind, fecha_registro) \
             VALUES (?1, ?2, 'R99999', 'RENDICION', '2024-01-01')",
        )
        .bind(ana.id)
        .bind(DEFAULT_COMPANY_ID)
        .execute(db.pool())
        .await
        .unwrap();

        let err = db
            .sequences()
            .next_code(ana.id, DEFAULT_COMPANY_ID, SequenceKind::Rendicion)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SequenceExhausted);

        // The other kind is unaffected
        let s = db
            .sequences()
            .next_code(ana.id, DEFAULT_COMPANY_ID, SequenceKind::Anticipo)
            .await
            .unwrap();
        assert_eq!(s.nombre, "S00001");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocation_yields_distinct_codes() {
        let path = std::env::temp_dir().join(format!("arendir-seq-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(path.clone()).max_connections(8))
            .await
            .unwrap();
        let user_id = user(&db, "ana@empresa.pe").await.id;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                db.sequences()
                    .next_code(user_id, DEFAULT_COMPANY_ID, SequenceKind::Rendicion)
                    .await
            }));
        }

        let mut codes = HashSet::new();
        for handle in handles {
            let entry = handle.await.unwrap().unwrap();
            assert!(codes.insert(entry.nombre), "duplicate code allocated");
        }

        let expected: HashSet<String> = (1..=8).map(|n| format!("R{:05}", n)).collect();
        assert_eq!(codes, expected);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_sixty_four_concurrent_allocations_all_succeed() {
        let path = std::env::temp_dir().join(format!("arendir-seq64-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(path.clone()).max_connections(8))
            .await
            .unwrap();
        let user_id = user(&db, "ana@empresa.pe").await.id;

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move {
                    db.sequences()
                        .next_code(user_id, DEFAULT_COMPANY_ID, SequenceKind::Rendicion)
                        .await
                })
            })
            .collect();

        let mut codes = HashSet::new();
        for handle in handles {
            let entry = handle.await.unwrap().expect("every allocation should succeed");
            assert!(codes.insert(entry.nombre), "duplicate code allocated");
        }

        let expected: HashSet<String> = (1..=64).map(|n| format!("R{:05}", n)).collect();
        assert_eq!(codes, expected);

        let last = db.sequences().last_entry(user_id, SequenceKind::Rendicion).await.unwrap();
        assert_eq!(last.nombre, "R00064");

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[tokio::test]
    async fn test_last_and_list_entries() {
        let db = memory_db().await;
        let ana = user(&db, "ana@empresa.pe").await;
        let repo = db.sequences();

        let err = repo.last_entry(ana.id, SequenceKind::Anticipo).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let first = repo
            .next_code(ana.id, DEFAULT_COMPANY_ID, SequenceKind::Anticipo)
            .await
            .unwrap();
        repo.next_code(ana.id, DEFAULT_COMPANY_ID, SequenceKind::Anticipo)
            .await
            .unwrap();

        let last = repo.last_entry(ana.id, SequenceKind::Anticipo).await.unwrap();
        assert_eq!(last.nombre, "S00002");

        repo.update_entry(
            first.id,
            &EntryPatch {
                estado: Some(EntryStatus::Pendiente),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let all = repo
            .list_entries(ana.id, SequenceKind::Anticipo, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].nombre, "S00001");

        let pending = repo
            .list_entries(ana.id, SequenceKind::Anticipo, Some(EntryStatus::Pendiente))
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, first.id);
    }

    #[tokio::test]
    async fn test_update_follows_lifecycle() {
        let db = memory_db().await;
        let ana = user(&db, "ana@empresa.pe").await;
        let repo = db.sequences();
        let entry = repo
            .next_code(ana.id, DEFAULT_COMPANY_ID, SequenceKind::Anticipo)
            .await
            .unwrap();

        let err = repo
            .update_entry(
                entry.id,
                &EntryPatch {
                    estado: Some(EntryStatus::Aprobado),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidTransition { .. })));

        let updated = repo
            .update_entry(
                entry.id,
                &EntryPatch {
                    estado: Some(EntryStatus::PorAprobar),
                    id_aprobador: Some(ana.id),
                    nom_aprobador: Some("Ana Quispe".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.estado, EntryStatus::PorAprobar);
        assert_eq!(updated.id_aprobador, Some(ana.id));
        assert_eq!(updated.nombre, entry.nombre);
        assert!(updated.fecha_actualizacion.is_some());

        let approved = repo
            .update_entry(
                entry.id,
                &EntryPatch {
                    estado: Some(EntryStatus::Aprobado),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(approved.estado, EntryStatus::Aprobado);
        // Earlier fields survive a partial patch
        assert_eq!(approved.nom_aprobador.as_deref(), Some("Ana Quispe"));

        // Solicitudes are never paid out
        let err = repo
            .update_entry(
                entry.id,
                &EntryPatch {
                    estado: Some(EntryStatus::Abonado),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_require_checks_kind() {
        let db = memory_db().await;
        let ana = user(&db, "ana@empresa.pe").await;
        let s = db
            .sequences()
            .next_code(ana.id, DEFAULT_COMPANY_ID, SequenceKind::Anticipo)
            .await
            .unwrap();

        assert!(db.sequences().require(s.id, SequenceKind::Anticipo).await.is_ok());
        let err = db
            .sequences()
            .require(s.id, SequenceKind::Rendicion)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::KindMismatch { .. })));

        let err = db.sequences().require(404, SequenceKind::Rendicion).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
