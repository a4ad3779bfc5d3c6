//! # Arendir API
//!
//! HTTP boundary for expense reports (rendiciones) and cash advances
//! (solicitudes): gapless per-user codes, document intake, reconciliation
//! and report export.
//!
//! ## Module Organization
//! - [`config`]: TOML file plus environment overrides
//! - [`error`]: error envelope and status mapping
//! - [`handlers`]: one module per resource
//! - [`integrations`]: object storage, report renderers, SUNAT client
//! - [`routes`]: the axum router
//! - [`state`]: shared handler context

pub mod config;
pub mod error;
pub mod handlers;
pub mod integrations;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use routes::build_router;
pub use state::AppState;
