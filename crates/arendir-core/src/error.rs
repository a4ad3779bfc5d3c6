//! # Error Types
//!
//! Domain-specific error types for arendir-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  arendir-core errors (this file)                                       │
//! │  ├── CoreError        - Domain rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  arendir-db errors (separate crate)                                    │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  API errors (apps/api)                                                 │
//! │  └── ApiError         - What the HTTP client sees                      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → HTTP status  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every layer reports an [`ErrorKind`]; the HTTP boundary is the only place
//! that turns a kind into a status code.

use serde::Serialize;
use thiserror::Error;

use crate::types::{EntryStatus, SequenceKind};

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse category of a failure, shared by every layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bad or missing input. Not retried.
    Validation,
    /// A referenced user, entry or document does not exist.
    NotFound,
    /// Duplicate link, duplicate document, lost sequence race.
    Conflict,
    /// Tax API, exchange-rate API, object storage or renderer failed.
    UpstreamUnavailable,
    /// The 5-digit code space of a (user, kind) pair is used up.
    SequenceExhausted,
    /// Anything else.
    Internal,
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Sequence allocation was requested for a user that does not exist.
    #[error("User {0} does not exist")]
    InvalidUser(i64),

    /// No more codes fit in the fixed-width format.
    ///
    /// ## When This Occurs
    /// ```text
    /// latest code: R99999
    ///      │
    ///      ▼
    /// next() → 100000 does not fit in 5 digits
    ///      │
    ///      ▼
    /// SequenceExhausted { kind: RENDICION }  (manual intervention)
    /// ```
    #[error("Sequence exhausted for {kind}: no code after {last}")]
    SequenceExhausted { kind: SequenceKind, last: String },

    /// A stored code does not match `^[RS]\d{5}$`.
    #[error("Malformed sequence code: '{0}'")]
    MalformedCode(String),

    /// Entity lookup failed.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A report has nothing to reconcile.
    #[error("Rendicion {0} has no documents to reconcile")]
    NoDocuments(i64),

    /// The (rendicion, solicitud) pair is already linked.
    #[error("Rendicion {rendicion_id} is already linked to solicitud {solicitud_id}")]
    DuplicateLink { rendicion_id: i64, solicitud_id: i64 },

    /// Same (fecha_emision, serie, correlativo, total) already submitted.
    #[error("Document {serie}-{correlativo} was already registered")]
    DuplicateDocument { serie: String, correlativo: String },

    /// The sequence entry belongs to another user.
    #[error("{entity} {id} does not belong to user {user_id}")]
    OwnershipMismatch {
        entity: &'static str,
        id: i64,
        user_id: i64,
    },

    /// An entry of one kind was used where the other was expected.
    #[error("Entry {id} is {actual}, expected {expected}")]
    KindMismatch {
        id: i64,
        expected: SequenceKind,
        actual: SequenceKind,
    },

    /// Lifecycle edge not allowed for this kind.
    #[error("Cannot move {kind} from {from} to {to}")]
    InvalidTransition {
        kind: SequenceKind,
        from: EntryStatus,
        to: EntryStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the category used for status mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::InvalidUser(_) | CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::SequenceExhausted { .. } => ErrorKind::SequenceExhausted,
            CoreError::DuplicateLink { .. } | CoreError::DuplicateDocument { .. } => {
                ErrorKind::Conflict
            }
            CoreError::MalformedCode(_) => ErrorKind::Internal,
            CoreError::NoDocuments(_)
            | CoreError::OwnershipMismatch { .. }
            | CoreError::KindMismatch { .. }
            | CoreError::InvalidTransition { .. }
            | CoreError::Validation(_) => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value has the wrong number of characters.
    #[error("{field} must have exactly {len} characters")]
    WrongLength { field: String, len: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Amount beyond what a document or a total may hold.
    #[error("{field} is out of range")]
    OutOfRange { field: String },

    /// Invalid format (e.g. non-digit RUC, bad decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::InvalidFormat`].
    pub fn format(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::DuplicateLink {
            rendicion_id: 4,
            solicitud_id: 9,
        };
        assert_eq!(
            err.to_string(),
            "Rendicion 4 is already linked to solicitud 9"
        );

        let err = CoreError::InvalidTransition {
            kind: SequenceKind::Anticipo,
            from: EntryStatus::Aprobado,
            to: EntryStatus::Abonado,
        };
        assert_eq!(
            err.to_string(),
            "Cannot move ANTICIPO from APROBADO to ABONADO"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(CoreError::InvalidUser(7).kind(), ErrorKind::NotFound);
        assert_eq!(CoreError::NoDocuments(1).kind(), ErrorKind::Validation);
        assert_eq!(
            CoreError::DuplicateDocument {
                serie: "F001".into(),
                correlativo: "123".into()
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            CoreError::SequenceExhausted {
                kind: SequenceKind::Rendicion,
                last: "R99999".into()
            }
            .kind(),
            ErrorKind::SequenceExhausted
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "ruc".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.kind(), ErrorKind::Validation);
    }
}
