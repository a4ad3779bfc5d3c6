//! # Pool and Repository Access
//!
//! ```text
//! DbConfig ──► connect_options() ──► SqlitePool ──► migrations
//!                                        │
//!                     Database (Clone) ◄─┘
//!                        │
//!   users() companies() sequences() links() documents() reports()
//! ```
//!
//! Every accessor hands out a repository holding a clone of the pool, so a
//! handler can take as many as it needs without coordination.
//!
//! ## Writers
//! The file runs in WAL mode: reconciliation reads proceed while a code is
//! being allocated. Two allocations for the same user still contend for the
//! single write lock; the loser waits up to `busy_timeout` and then retries
//! against the unique index (see `repository::sequence`).

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::company::CompanyRepository;
use crate::repository::document::DocumentRepository;
use crate::repository::link::LinkRepository;
use crate::repository::report::ReportRepository;
use crate::repository::sequence::SequenceRepository;
use crate::repository::user::UserRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// How to open the database.
///
/// ```rust,ignore
/// let config = DbConfig::new("arendir.db")
///     .max_connections(16)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file; created on first open. `:memory:` for a private database.
    pub path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Upper bound on waiting for a free pooled connection.
    pub connect_timeout: Duration,
    /// `None` keeps idle connections forever.
    pub idle_timeout: Option<Duration>,
    /// Upper bound on waiting for the SQLite write lock.
    pub busy_timeout: Duration,
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            path: path.into(),
            max_connections: 8,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// A private in-memory database for tests.
    ///
    /// Each SQLite connection to `:memory:` is its own database, so the pool
    /// is pinned to one connection that never idles out.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            busy_timeout: Duration::from_secs(1),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_memory(&self) -> bool {
        self.path == Path::new(MEMORY_PATH)
    }

    /// Per-connection settings: foreign keys on, WAL for files, busy timeout.
    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
                .journal_mode(SqliteJournalMode::Memory)
        } else {
            SqliteConnectOptions::new()
                .filename(&self.path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };

        Ok(options.foreign_keys(true).busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Shared handle over the pool. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, applies pending migrations.
    ///
    /// ## Errors
    /// - `ConnectionFailed` if the file cannot be opened or created
    /// - `MigrationFailed` if the schema cannot be brought up to date
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        if config.min_connections > config.max_connections {
            warn!(
                min = config.min_connections,
                max = config.max_connections,
                "min_connections above max_connections, clamping"
            );
        }
        let min_connections = config.min_connections.min(config.max_connections);

        debug!(
            path = %config.path.display(),
            max_connections = config.max_connections,
            busy_timeout_ms = config.busy_timeout.as_millis() as u64,
            "Opening database"
        );

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(if config.is_memory() { None } else { Some(Duration::from_secs(1800)) })
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }

        info!(
            path = %config.path.display(),
            max_connections = config.max_connections,
            "Database ready"
        );
        Ok(db)
    }

    /// Applies pending migrations; already-applied ones are skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn companies(&self) -> CompanyRepository {
        CompanyRepository::new(self.pool.clone())
    }

    /// Rendiciones and solicitudes: code allocation, listing, lifecycle.
    pub fn sequences(&self) -> SequenceRepository {
        SequenceRepository::new(self.pool.clone())
    }

    pub fn links(&self) -> LinkRepository {
        LinkRepository::new(self.pool.clone())
    }

    pub fn documents(&self) -> DocumentRepository {
        DocumentRepository::new(self.pool.clone())
    }

    /// Reconciliation and the review listing.
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }

    /// Waits for checked-out connections and closes the pool.
    pub async fn close(&self) {
        info!("Closing database pool");
        self.pool.close().await;
    }

    /// `true` if a trivial query round-trips.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let company = db.companies().get(arendir_core::DEFAULT_COMPANY_ID).await.unwrap();
        assert!(company.is_some());
    }

    #[test]
    fn test_builder_and_memory_detection() {
        let config = DbConfig::new("/tmp/arendir-test.db")
            .max_connections(10)
            .min_connections(2)
            .busy_timeout(Duration::from_millis(250))
            .run_migrations(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.run_migrations);
        assert!(!config.is_memory());

        let memory = DbConfig::in_memory();
        assert!(memory.is_memory());
        assert_eq!(memory.max_connections, 1);
        assert!(memory.idle_timeout.is_none());
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let path = std::env::temp_dir().join(format!("arendir-pool-{}.db", uuid::Uuid::new_v4()));

        let db = Database::new(DbConfig::new(path.clone())).await.unwrap();
        let user = crate::repository::test_support::user(&db, "reopen@andina.pe").await;
        db.close().await;
        assert!(!db.health_check().await);

        let reopened = Database::new(DbConfig::new(path.clone())).await.unwrap();
        assert!(reopened.users().get(user.id).await.unwrap().is_some());
        reopened.close().await;

        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
