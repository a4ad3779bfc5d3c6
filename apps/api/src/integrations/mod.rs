//! # External Collaborators
//!
//! Everything the API talks to besides the database.
//!
//! ```text
//! ┌────────────────────┐   ┌────────────────────┐   ┌────────────────────┐
//! │  storage           │   │  export            │   │  sunat             │
//! │  ObjectStorage     │   │  ReportRenderer    │   │  SunatClient       │
//! │  bytes ──► URL     │   │  result ──► bytes  │   │  RUC, FX rate      │
//! └────────────────────┘   └────────────────────┘   └────────────────────┘
//! ```
//!
//! All three are held by [`crate::state::AppState`] and injected into
//! handlers; none of them is a global.

pub mod export;
pub mod storage;
pub mod sunat;

use arendir_core::{ErrorKind, ValidationError};
use thiserror::Error;

/// Failure of an external collaborator.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// Bad input caught before any call was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The upstream answered that the thing does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The service is down, slow, misconfigured or answered garbage.
    #[error("{service} unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },
}

impl IntegrationError {
    pub fn unavailable(service: &'static str, message: impl Into<String>) -> Self {
        IntegrationError::Unavailable {
            service,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            IntegrationError::Validation(_) => ErrorKind::Validation,
            IntegrationError::NotFound { .. } => ErrorKind::NotFound,
            IntegrationError::Unavailable { .. } => ErrorKind::UpstreamUnavailable,
        }
    }
}
