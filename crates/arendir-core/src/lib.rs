//! # arendir-core: Pure Business Logic for Arendir
//!
//! This crate holds the rules of the expense-report system as pure
//! functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Arendir Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    apps/api (axum)                              │   │
//! │  │   POST /rendicion/ ─ POST /documentos/ ─ GET .../reconciliation │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    arendir-db (SQLite)                          │   │
//! │  │   sequence allocation, links, documents, reconciliation reads  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ arendir-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌──────────┐ ┌────────────────┐ ┌──────────────┐  │   │
//! │  │  │  types  │ │ sequence │ │ reconciliation │ │  validation  │  │   │
//! │  │  │  money  │ │ R00001   │ │ gasto−anticipo │ │  qr          │  │   │
//! │  │  └─────────┘ └──────────┘ └────────────────┘ └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (SequenceEntry, Documento, User, ...)
//! - [`money`] - Integer money and exchange rates (no floating point)
//! - [`sequence`] - `R00001` / `S00001` code parsing and increment
//! - [`reconciliation`] - Expense vs. advance netting
//! - [`validation`] - RUC, DNI, serie and amount checks
//! - [`qr`] - Classification of decoded receipt QR tokens
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use arendir_core::sequence::SequenceCode;
//! use arendir_core::SequenceKind;
//!
//! let first = SequenceCode::first(SequenceKind::Rendicion);
//! assert_eq!(first.to_string(), "R00001");
//!
//! let next = SequenceCode::parse("S00041").unwrap().next().unwrap();
//! assert_eq!(next.to_string(), "S00042");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod qr;
pub mod reconciliation;
pub mod sequence;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::{ExchangeRate, Money};
pub use reconciliation::{AdvancePolicy, Settlement, Totals};
pub use sequence::SequenceCode;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Number of zero-padded digits after the kind prefix (`R00001`).
pub const CODE_WIDTH: usize = 5;

/// Largest number representable in a sequence code.
///
/// Allocating past it fails with `SequenceExhausted` instead of widening the
/// code, because existing codes must keep sorting lexicographically.
pub const MAX_SEQUENCE_NUMBER: u32 = 99_999;

/// Company assigned to users created without an explicit one.
pub const DEFAULT_COMPANY_ID: i64 = 1;
