//! # HTTP Handlers
//!
//! Thin adapters: extract, call a repository or collaborator, serialize.
//! Business rules live in arendir-core and arendir-db; every error is
//! converted to [`crate::error::ApiError`] through `?`.
//!
//! ## Handler Groups
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────────────┐
//! │ sequence         │ POST /rendicion/, /solicitud/, last, nombres, PUT    │
//! │ link             │ POST/DELETE /rendicion_solicitud                     │
//! │ report           │ reconciliation, export, con-documentos               │
//! │ document         │ /documentos CRUD and review                          │
//! │ directory        │ /users, /companies                                   │
//! │ consulta         │ /process-qr/, /consulta/ruc, /consulta/tipo-cambio   │
//! │ health           │ /health                                              │
//! └──────────────────┴──────────────────────────────────────────────────────┘
//! ```

pub mod consulta;
pub mod directory;
pub mod document;
pub mod health;
pub mod link;
pub mod report;
pub mod sequence;
