//! # Database Errors
//!
//! ```text
//! sqlx::Error ──────────┐
//! MigrateError ─────────┼──► DbError ──kind()──► ErrorKind ──► HTTP status (apps/api)
//! CoreError (domain) ───┘        │
//!                                └── is_unique_violation(): sequence retry signal
//! ```
//!
//! Constraint failures are classified with sqlx's own `ErrorKind`, so the
//! mapping does not depend on SQLite message wording. The constraint text is
//! kept in the variant for logs.

use arendir_core::{CoreError, ErrorKind};
use sqlx::error::ErrorKind as SqlxErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A domain rule rejected the operation (unknown user, duplicate link...).
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// A UNIQUE index refused the row.
    ///
    /// Two allocations racing for the same code land here; so does a
    /// second account with an existing email.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A row changed between read and write (optimistic update lost).
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    /// CHECK or NOT NULL constraint (bad enum text, malformed code).
    #[error("Constraint violation: {message}")]
    CheckViolation { message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// No pooled connection freed up within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DbError::Domain(CoreError::not_found(entity, id))
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for UNIQUE violations, the signal to retry a sequence allocation.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, DbError::UniqueViolation { .. })
    }

    /// Category used for status mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Domain(err) => err.kind(),
            DbError::UniqueViolation { .. } | DbError::Conflict(_) => ErrorKind::Conflict,
            DbError::ForeignKeyViolation { .. } | DbError::CheckViolation { .. } => {
                ErrorKind::Validation
            }
            DbError::ConnectionFailed(_)
            | DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::PoolExhausted
            | DbError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// SQLITE_BUSY / SQLITE_LOCKED, including their extended codes.
fn is_lock_timeout(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, 5 | 6))
        .unwrap_or(false)
}

/// `UNIQUE constraint failed: sequence_entries.id_user, ...` → the column list.
fn constraint_target(message: &str) -> String {
    message
        .split_once(": ")
        .map(|(_, target)| target.to_string())
        .unwrap_or_else(|| message.to_string())
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    SqlxErrorKind::UniqueViolation => DbError::UniqueViolation {
                        field: constraint_target(&message),
                        value: "unknown".to_string(),
                    },
                    SqlxErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation { message },
                    SqlxErrorKind::CheckViolation | SqlxErrorKind::NotNullViolation => {
                        DbError::CheckViolation { message }
                    }
                    _ if is_lock_timeout(db_err.code().as_deref()) => {
                        DbError::Conflict(format!("database busy: {message}"))
                    }
                    _ => DbError::QueryFailed(message),
                }
            }
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::memory_db;

    #[test]
    fn test_kinds() {
        assert_eq!(DbError::duplicate("users.email", "a@b.pe").kind(), ErrorKind::Conflict);
        assert_eq!(DbError::not_found("Documento", 3).kind(), ErrorKind::NotFound);
        assert_eq!(DbError::PoolExhausted.kind(), ErrorKind::Internal);
        assert!(DbError::duplicate("x", "y").is_unique_violation());
    }

    #[test]
    fn test_constraint_target() {
        assert_eq!(
            constraint_target("UNIQUE constraint failed: users.email"),
            "users.email"
        );
        assert_eq!(constraint_target("weird"), "weird");
    }

    #[test]
    fn test_lock_codes() {
        assert!(is_lock_timeout(Some("5")));
        assert!(is_lock_timeout(Some("517")));
        assert!(is_lock_timeout(Some("6")));
        assert!(!is_lock_timeout(Some("2067")));
        assert!(!is_lock_timeout(None));
    }

    #[tokio::test]
    async fn test_sqlite_constraints_are_classified() {
        let db = memory_db().await;

        let err: DbError = sqlx::query("INSERT INTO companies (id, name) VALUES (1, 'again')")
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(err.is_unique_violation(), "{err:?}");

        let err: DbError = sqlx::query(
            "INSERT INTO rendicion_solicitud (rendicion_id, solicitud_id, estado, created_at) \
             VALUES (999, 998, 'ACTIVO', '2024-03-05T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .unwrap_err()
        .into();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }), "{err:?}");
    }
}
