//! # Database Migrations
//!
//! SQL migrations embedded at compile time from `migrations/sqlite/`.
//!
//! ```text
//! startup ──► _sqlx_migrations ──► compare checksums ──► run pending in order
//!                                       │
//!                                       └── 001_initial_schema.sql
//!                                           companies, users, sequence_entries,
//!                                           rendicion_solicitud, documentos
//! ```
//!
//! Never edit an applied migration: add `NNN_description.sql` instead.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending migrations. Each one runs in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(embedded, applied)` migration counts, for the health endpoint.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}
