//! # Reconciliation
//!
//! Nets the expenses of a rendicion against the advances that funded it.
//!
//! ## Computation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rendicion R00001                                                       │
//! │    documents: GASTO/RENDICION, estado != RECHAZADO                      │
//! │       120.50 + 79.50 ─────────────────────────────► total_gasto  200.00 │
//! │                                                                         │
//! │  rendicion_solicitud ──► S00001                                         │
//! │    documents: ANTICIPO, counted by AdvancePolicy                        │
//! │       500.00 (APROBADO) ──────────────────────────► total_anticipo 500  │
//! │                                                                         │
//! │  reembolso = total_gasto − total_anticipo = −300.00                     │
//! │    > 0  company pays the employee                                       │
//! │    < 0  employee returns the difference                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The functions here only see documents already fetched by the caller, so
//! the arithmetic is testable without a database. A null `total` counts as
//! zero and a rejected document never counts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{DocumentStatus, Documento, SequenceEntry, SequenceKind, TipoSolicitud};

// =============================================================================
// Advance Policy
// =============================================================================

/// Which advance documents offset expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AdvancePolicy {
    /// Only APROBADO advances count. Pending money was never disbursed.
    ApprovedOnly,
    /// Every advance that is not RECHAZADO counts.
    NotRejected,
}

impl AdvancePolicy {
    /// Whether an advance document in `status` counts toward `total_anticipo`.
    pub fn counts(&self, status: DocumentStatus) -> bool {
        match self {
            AdvancePolicy::ApprovedOnly => status == DocumentStatus::Aprobado,
            AdvancePolicy::NotRejected => !status.is_rejected(),
        }
    }
}

impl Default for AdvancePolicy {
    fn default() -> Self {
        AdvancePolicy::ApprovedOnly
    }
}

impl fmt::Display for AdvancePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdvancePolicy::ApprovedOnly => write!(f, "approved_only"),
            AdvancePolicy::NotRejected => write!(f, "not_rejected"),
        }
    }
}

impl FromStr for AdvancePolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "approved_only" | "approved" => Ok(AdvancePolicy::ApprovedOnly),
            "not_rejected" => Ok(AdvancePolicy::NotRejected),
            _ => Err(ValidationError::NotAllowed {
                field: "advance_policy".to_string(),
                allowed: vec!["approved_only".to_string(), "not_rejected".to_string()],
            }),
        }
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Who owes whom after netting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    /// The company reimburses the employee `|reembolso|`.
    EmployeeOwed,
    /// The employee returns `|reembolso|` to the company.
    EmployeeOwes,
    Settled,
}

/// The three reconciliation figures.
///
/// Sign convention: `reembolso > 0` means the company owes the employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    #[ts(as = "String")]
    pub total_gasto: Money,
    #[ts(as = "String")]
    pub total_anticipo: Money,
    #[ts(as = "String")]
    pub reembolso: Money,
}

impl Totals {
    pub fn new(total_gasto: Money, total_anticipo: Money) -> Self {
        Totals {
            total_gasto,
            total_anticipo,
            reembolso: total_gasto - total_anticipo,
        }
    }

    pub fn settlement(&self) -> Settlement {
        if self.reembolso.is_positive() {
            Settlement::EmployeeOwed
        } else if self.reembolso.is_negative() {
            Settlement::EmployeeOwes
        } else {
            Settlement::Settled
        }
    }

    /// Amount that changes hands, always non-negative.
    pub fn settlement_amount(&self) -> Money {
        self.reembolso.abs()
    }
}

// =============================================================================
// Result Types
// =============================================================================

/// Identity fields printed on the signed export.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportHeader {
    pub full_name: String,
    pub dni: Option<String>,
    pub cargo: Option<String>,
    pub ceco: Option<String>,
    pub gerencia: Option<String>,
    pub empresa: Option<String>,
}

/// Everything a reconciliation export needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconciliationResult {
    pub rendicion: SequenceEntry,
    pub header: ReportHeader,
    /// Codes of the linked solicitudes.
    pub solicitudes: Vec<String>,
    /// Counted expense lines.
    pub gastos: Vec<Documento>,
    /// Counted advance lines.
    pub anticipos: Vec<Documento>,
    #[serde(flatten)]
    pub totals: Totals,
    pub settlement: Settlement,
}

/// Output of [`net`]: the counted lines plus their totals.
#[derive(Debug, Clone, PartialEq)]
pub struct Netting {
    pub gastos: Vec<Documento>,
    pub anticipos: Vec<Documento>,
    pub totals: Totals,
}

// =============================================================================
// Engine
// =============================================================================

/// Sum of document totals, skipping rejected ones and counting null as zero.
///
/// ## Errors
/// - `Validation(OutOfRange)` if the sum leaves the `i64` range
pub fn sum_counted<'a, I>(documents: I) -> CoreResult<Money>
where
    I: IntoIterator<Item = &'a Documento>,
{
    let totals = documents
        .into_iter()
        .filter(|d| !d.estado.is_rejected())
        .map(Documento::total_or_zero);
    Ok(Money::try_sum("total", totals)?)
}

/// Whether `doc` is an expense line of `rendicion`.
fn is_expense_of(doc: &Documento, rendicion: &SequenceEntry) -> bool {
    doc.id_numero_rendicion == rendicion.id
        && doc.tipo_solicitud.owning_kind() == SequenceKind::Rendicion
        && !doc.estado.is_rejected()
}

/// Whether `doc` is a counted advance of one of `solicitud_ids`.
fn is_counted_advance(doc: &Documento, solicitud_ids: &[i64], policy: AdvancePolicy) -> bool {
    doc.tipo_solicitud == TipoSolicitud::Anticipo
        && solicitud_ids.contains(&doc.id_numero_rendicion)
        && !doc.estado.is_rejected()
        && policy.counts(doc.estado)
}

/// Nets a rendicion's expenses against its linked advances.
///
/// ## Arguments
/// * `rendicion` - the report being closed; must be of kind RENDICION
/// * `expenses` - documents fetched for the report
/// * `solicitud_ids` - linked solicitudes; empty means no advances
/// * `advances` - documents fetched for those solicitudes
/// * `policy` - which advance states count
///
/// ## Errors
/// - `KindMismatch` if `rendicion` is a solicitud
/// - `NoDocuments` if no expense document survives the filters
/// - `Validation(OutOfRange)` if a total leaves the `i64` range
///
/// ## Example
/// ```rust,ignore
/// let netting = net(&rendicion, docs, &[s1.id], advances, AdvancePolicy::ApprovedOnly)?;
/// assert_eq!(netting.totals.reembolso.to_string(), "-300.00");
/// ```
pub fn net(
    rendicion: &SequenceEntry,
    expenses: Vec<Documento>,
    solicitud_ids: &[i64],
    advances: Vec<Documento>,
    policy: AdvancePolicy,
) -> CoreResult<Netting> {
    if rendicion.kind != SequenceKind::Rendicion {
        return Err(CoreError::KindMismatch {
            id: rendicion.id,
            expected: SequenceKind::Rendicion,
            actual: rendicion.kind,
        });
    }

    let gastos: Vec<Documento> = expenses
        .into_iter()
        .filter(|d| is_expense_of(d, rendicion))
        .collect();

    if gastos.is_empty() {
        return Err(CoreError::NoDocuments(rendicion.id));
    }

    let anticipos: Vec<Documento> = if solicitud_ids.is_empty() {
        Vec::new()
    } else {
        advances
            .into_iter()
            .filter(|d| is_counted_advance(d, solicitud_ids, policy))
            .collect()
    };

    let total_gasto = Money::try_sum("total_gasto", gastos.iter().map(Documento::total_or_zero))?;
    let total_anticipo =
        Money::try_sum("total_anticipo", anticipos.iter().map(Documento::total_or_zero))?;

    Ok(Netting {
        gastos,
        anticipos,
        totals: Totals::new(total_gasto, total_anticipo),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
