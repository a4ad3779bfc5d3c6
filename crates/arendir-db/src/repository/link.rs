//! # Link Repository
//!
//! `rendicion_solicitud`: which solicitud (advance) funds which rendicion
//! (report). The pair is unique; linking twice is a conflict, unlinking
//! twice is a no-op.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::sequence::SequenceRepository;
use arendir_core::{CoreError, SequenceKind, SequenceLink};

const LINK_COLUMNS: &str = "id, rendicion_id, solicitud_id, estado, created_at";

/// Repository for rendicion ↔ solicitud links.
#[derive(Debug, Clone)]
pub struct LinkRepository {
    pool: SqlitePool,
}

impl LinkRepository {
    /// Creates a new LinkRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LinkRepository { pool }
    }

    /// Links a solicitud to a rendicion.
    ///
    /// ## Errors
    /// - `NotFound` if either entry is missing
    /// - `KindMismatch` if the ids are swapped or both of one kind
    /// - `DuplicateLink` if the pair is already linked
    pub async fn link(
        &self,
        rendicion_id: i64,
        solicitud_id: i64,
        estado: &str,
    ) -> DbResult<SequenceLink> {
        let entries = SequenceRepository::new(self.pool.clone());
        entries.require(rendicion_id, SequenceKind::Rendicion).await?;
        entries.require(solicitud_id, SequenceKind::Anticipo).await?;

        debug!(rendicion_id, solicitud_id, estado = %estado, "Linking solicitud to rendicion");

        let sql = format!(
            "INSERT INTO rendicion_solicitud (rendicion_id, solicitud_id, estado, created_at) \
             VALUES (?1, ?2, ?3, ?4) RETURNING {LINK_COLUMNS}"
        );
        let link = sqlx::query_as::<_, SequenceLink>(&sql)
            .bind(rendicion_id)
            .bind(solicitud_id)
            .bind(estado.trim())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { .. } => DbError::Domain(CoreError::DuplicateLink {
                    rendicion_id,
                    solicitud_id,
                }),
                other => other,
            })?;

        info!(link_id = link.id, rendicion_id, solicitud_id, "Link created");
        Ok(link)
    }

    /// Removes a link. Returns whether a row was deleted.
    pub async fn unlink(&self, rendicion_id: i64, solicitud_id: i64) -> DbResult<bool> {
        let result = sqlx::query(
            "DELETE FROM rendicion_solicitud WHERE rendicion_id = ?1 AND solicitud_id = ?2",
        )
        .bind(rendicion_id)
        .bind(solicitud_id)
        .execute(&self.pool)
        .await?;

        let removed = result.rows_affected() > 0;
        debug!(rendicion_id, solicitud_id, removed, "Unlink");
        Ok(removed)
    }

    /// Links of a rendicion, oldest first.
    pub async fn for_rendicion(&self, rendicion_id: i64) -> DbResult<Vec<SequenceLink>> {
        let sql = format!(
            "SELECT {LINK_COLUMNS} FROM rendicion_solicitud WHERE rendicion_id = ?1 ORDER BY id"
        );
        let links = sqlx::query_as::<_, SequenceLink>(&sql)
            .bind(rendicion_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(links)
    }
}
