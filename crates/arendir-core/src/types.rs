//! # Domain Types
//!
//! Core domain types used throughout Arendir.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌─────────────────┐      │
//! │  │    Company      │◄──│      User        │◄──│  SequenceEntry  │      │
//! │  │  id, name, ruc  │   │ id_empresa, dni  │   │ kind R / S      │      │
//! │  └─────────────────┘   │ cargo, ceco      │   │ nombre R00001   │      │
//! │                        └──────────────────┘   │ estado          │      │
//! │                                               └───────┬─────────┘      │
//! │                     ┌─────────────────┐               │                │
//! │                     │  SequenceLink   │ R ◄──► S      │ 1..*           │
//! │                     │ (rendicion_     │               ▼                │
//! │                     │  solicitud)     │       ┌─────────────────┐      │
//! │                     └─────────────────┘       │   Documento     │      │
//! │                                               │ total, igv, ruc │      │
//! │                                               │ tipo_solicitud  │      │
//! │                                               └─────────────────┘      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rendiciones and solicitudes share one shape and one table; [`SequenceKind`]
//! tells them apart and scopes code uniqueness.
//!
//! ## Canonical Keys
//! - Documents point at their entry through `id_numero_rendicion`. The
//!   `numero_rendicion` code on a [`Documento`] is filled from a join.
//! - Tenancy is `id_empresa`. The `empresa` name is filled from a join.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{ExchangeRate, Money};

// =============================================================================
// Sequence Kind
// =============================================================================

/// Which sequence a code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum SequenceKind {
    /// Expense report, codes `R00001`.
    Rendicion,
    /// Cash-advance request (solicitud), codes `S00001`.
    Anticipo,
}

impl SequenceKind {
    /// Letter that starts every code of this kind.
    pub const fn prefix(&self) -> char {
        match self {
            SequenceKind::Rendicion => 'R',
            SequenceKind::Anticipo => 'S',
        }
    }

    pub fn from_prefix(prefix: char) -> Option<Self> {
        match prefix {
            'R' => Some(SequenceKind::Rendicion),
            'S' => Some(SequenceKind::Anticipo),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            SequenceKind::Rendicion => "RENDICION",
            SequenceKind::Anticipo => "ANTICIPO",
        }
    }

    /// Human label used in error messages and exports.
    pub const fn entity(&self) -> &'static str {
        match self {
            SequenceKind::Rendicion => "Rendicion",
            SequenceKind::Anticipo => "Solicitud",
        }
    }
}

impl fmt::Display for SequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SequenceKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "RENDICION" => Ok(SequenceKind::Rendicion),
            "ANTICIPO" | "SOLICITUD" => Ok(SequenceKind::Anticipo),
            _ => Err(ValidationError::NotAllowed {
                field: "tipo".to_string(),
                allowed: vec!["RENDICION".to_string(), "ANTICIPO".to_string()],
            }),
        }
    }
}

// =============================================================================
// Entry Status
// =============================================================================

/// Lifecycle of a rendicion or solicitud.
///
/// ## State Machine
/// ```text
///            ┌──────────► PENDIENTE ──────┐
///            │                │           ▼
///  NUEVO ────┤                ▼      APROBADO ──► ABONADO (rendicion only)
///            │          POR APROBAR ──┤
///            └──────────────►         └─► RECHAZADO
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryStatus {
    Nuevo,
    Pendiente,
    #[serde(rename = "POR APROBAR")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "POR APROBAR"))]
    PorAprobar,
    Aprobado,
    Rechazado,
    Abonado,
}

impl EntryStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Nuevo => "NUEVO",
            EntryStatus::Pendiente => "PENDIENTE",
            EntryStatus::PorAprobar => "POR APROBAR",
            EntryStatus::Aprobado => "APROBADO",
            EntryStatus::Rechazado => "RECHAZADO",
            EntryStatus::Abonado => "ABONADO",
        }
    }

    /// Whether a reviewer may move an entry of `kind` from `self` to `next`.
    ///
    /// Re-asserting the current state is always allowed.
    pub fn can_transition_to(&self, next: EntryStatus, kind: SequenceKind) -> bool {
        use EntryStatus::*;

        if *self == next {
            return true;
        }

        match (self, next) {
            (Nuevo, Pendiente | PorAprobar) => true,
            (Pendiente, PorAprobar | Aprobado | Rechazado) => true,
            (PorAprobar, Aprobado | Rechazado) => true,
            (Aprobado, Abonado) => kind == SequenceKind::Rendicion,
            _ => false,
        }
    }
}

impl Default for EntryStatus {
    fn default() -> Self {
        EntryStatus::Nuevo
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('_', " ").as_str() {
            "NUEVO" => Ok(EntryStatus::Nuevo),
            "PENDIENTE" => Ok(EntryStatus::Pendiente),
            "POR APROBAR" => Ok(EntryStatus::PorAprobar),
            "APROBADO" => Ok(EntryStatus::Aprobado),
            "RECHAZADO" => Ok(EntryStatus::Rechazado),
            "ABONADO" => Ok(EntryStatus::Abonado),
            _ => Err(ValidationError::NotAllowed {
                field: "estado".to_string(),
                allowed: [
                    EntryStatus::Nuevo,
                    EntryStatus::Pendiente,
                    EntryStatus::PorAprobar,
                    EntryStatus::Aprobado,
                    EntryStatus::Rechazado,
                    EntryStatus::Abonado,
                ]
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            }),
        }
    }
}

// =============================================================================
// Document Status & Classification
// =============================================================================

/// Review state of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentStatus {
    Pendiente,
    #[serde(rename = "POR APROBAR")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "POR APROBAR"))]
    PorAprobar,
    Aprobado,
    Rechazado,
    Abonado,
}

impl DocumentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pendiente => "PENDIENTE",
            DocumentStatus::PorAprobar => "POR APROBAR",
            DocumentStatus::Aprobado => "APROBADO",
            DocumentStatus::Rechazado => "RECHAZADO",
            DocumentStatus::Abonado => "ABONADO",
        }
    }

    /// Rejected documents never count toward any total.
    #[inline]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, DocumentStatus::Rechazado)
    }
}

impl Default for DocumentStatus {
    fn default() -> Self {
        DocumentStatus::Pendiente
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('_', " ").as_str() {
            "PENDIENTE" => Ok(DocumentStatus::Pendiente),
            "POR APROBAR" => Ok(DocumentStatus::PorAprobar),
            "APROBADO" => Ok(DocumentStatus::Aprobado),
            "RECHAZADO" => Ok(DocumentStatus::Rechazado),
            "ABONADO" => Ok(DocumentStatus::Abonado),
            other => Err(ValidationError::format(
                "estado",
                format!("unknown document state '{}'", other),
            )),
        }
    }
}

/// How a document is classified inside its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum TipoSolicitud {
    /// Expense line (mobility, travel) filed on a report.
    Gasto,
    /// Expense receipt filed on a report.
    Rendicion,
    /// Advance disbursement filed on a solicitud.
    Anticipo,
}

impl TipoSolicitud {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TipoSolicitud::Gasto => "GASTO",
            TipoSolicitud::Rendicion => "RENDICION",
            TipoSolicitud::Anticipo => "ANTICIPO",
        }
    }

    /// The entry kind a document of this type must be attached to.
    pub const fn owning_kind(&self) -> SequenceKind {
        match self {
            TipoSolicitud::Gasto | TipoSolicitud::Rendicion => SequenceKind::Rendicion,
            TipoSolicitud::Anticipo => SequenceKind::Anticipo,
        }
    }
}

impl fmt::Display for TipoSolicitud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sequence Entry (Rendicion / Solicitud)
// =============================================================================

/// A rendicion or solicitud header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SequenceEntry {
    pub id: i64,
    pub id_user: i64,
    pub id_empresa: i64,
    /// `R00001` / `S00001`, unique per (id_user, kind).
    pub nombre: String,
    #[serde(rename = "tipo")]
    pub kind: SequenceKind,
    pub estado: EntryStatus,
    #[ts(as = "String")]
    pub fecha_registro: NaiveDate,
    #[ts(as = "Option<String>")]
    pub fecha_actualizacion: Option<NaiveDate>,
    pub id_aprobador: Option<i64>,
    pub nom_aprobador: Option<String>,
    pub id_contador: Option<i64>,
    pub nom_contador: Option<String>,
}

/// Reviewer changes to an entry. Absent fields stay untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EntryPatch {
    pub estado: Option<EntryStatus>,
    pub id_aprobador: Option<i64>,
    pub nom_aprobador: Option<String>,
    pub id_contador: Option<i64>,
    pub nom_contador: Option<String>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.estado.is_none()
            && self.id_aprobador.is_none()
            && self.nom_aprobador.is_none()
            && self.id_contador.is_none()
            && self.nom_contador.is_none()
    }
}

// =============================================================================
// Sequence Link (rendicion_solicitud)
// =============================================================================

/// Records that a solicitud's advance funds a rendicion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SequenceLink {
    pub id: i64,
    pub rendicion_id: i64,
    pub solicitud_id: i64,
    /// Free-form, e.g. `ACTIVO`.
    pub estado: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Documento
// =============================================================================

/// One expense or advance line item.
///
/// Amounts are stored in cents (`*_cents` columns). `numero_rendicion` and
/// `empresa` are read-only, resolved from the owning entry and company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Documento {
    pub id: i64,
    pub id_user: i64,
    pub id_empresa: i64,
    pub id_numero_rendicion: i64,
    pub tipo_solicitud: TipoSolicitud,
    pub estado: DocumentStatus,

    #[ts(as = "Option<String>")]
    pub fecha_solicitud: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub fecha_emision: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub fecha_rendicion: Option<NaiveDate>,

    pub dni: Option<String>,
    pub usuario: Option<String>,
    pub gerencia: Option<String>,
    pub ruc: Option<String>,
    pub proveedor: Option<String>,
    pub tipo_documento: Option<String>,
    pub serie: Option<String>,
    pub correlativo: Option<String>,
    pub tipo_gasto: Option<String>,
    pub rubro: Option<String>,
    pub cuenta_contable: Option<String>,
    pub motivo: Option<String>,
    pub origen: Option<String>,
    pub destino: Option<String>,
    pub detalle: Option<String>,
    pub archivo: Option<String>,

    pub moneda: String,
    #[ts(as = "Option<String>")]
    pub tipo_cambio: Option<ExchangeRate>,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "sub_total_cents"))]
    #[ts(as = "Option<String>")]
    pub sub_total: Option<Money>,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "igv_cents"))]
    #[ts(as = "Option<String>")]
    pub igv: Option<Money>,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "no_gravadas_cents"))]
    #[ts(as = "Option<String>")]
    pub no_gravadas: Option<Money>,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "importe_facturado_cents"))]
    #[ts(as = "Option<String>")]
    pub importe_facturado: Option<Money>,
    /// Amount in local currency. Null counts as zero in every total.
    #[cfg_attr(feature = "sqlx", sqlx(rename = "total_cents"))]
    #[ts(as = "Option<String>")]
    pub total: Option<Money>,

    /// Code of the owning entry (derived).
    pub numero_rendicion: String,
    /// Company name (derived).
    pub empresa: Option<String>,
}

impl Documento {
    /// Total with null treated as zero.
    #[inline]
    pub fn total_or_zero(&self) -> Money {
        self.total.unwrap_or_default()
    }
}

/// Input for creating a document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewDocumento {
    pub id_user: i64,
    /// 0 (or absent) means the owning entry's company.
    #[serde(default)]
    pub id_empresa: i64,
    pub id_numero_rendicion: i64,
    pub tipo_solicitud: Option<TipoSolicitud>,
    pub estado: Option<DocumentStatus>,

    #[ts(as = "Option<String>")]
    pub fecha_solicitud: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub fecha_emision: Option<NaiveDate>,

    pub dni: Option<String>,
    pub usuario: Option<String>,
    pub gerencia: Option<String>,
    pub ruc: Option<String>,
    pub proveedor: Option<String>,
    pub tipo_documento: Option<String>,
    pub serie: Option<String>,
    pub correlativo: Option<String>,
    pub tipo_gasto: Option<String>,
    pub rubro: Option<String>,
    pub cuenta_contable: Option<String>,
    pub motivo: Option<String>,
    pub origen: Option<String>,
    pub destino: Option<String>,
    pub detalle: Option<String>,
    pub archivo: Option<String>,

    pub moneda: Option<String>,
    #[ts(as = "Option<String>")]
    pub tipo_cambio: Option<ExchangeRate>,
    #[ts(as = "Option<String>")]
    pub sub_total: Option<Money>,
    #[ts(as = "Option<String>")]
    pub igv: Option<Money>,
    #[ts(as = "Option<String>")]
    pub no_gravadas: Option<Money>,
    #[ts(as = "Option<String>")]
    pub importe_facturado: Option<Money>,
    #[ts(as = "Option<String>")]
    pub total: Option<Money>,
}

// =============================================================================
// User & Company
// =============================================================================

/// Role of a user inside a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Colaborador,
    Aprobador,
    Contador,
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Colaborador
    }
}

/// A user, without credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub id_empresa: i64,
    pub dni: Option<String>,
    pub cargo: Option<String>,
    pub ceco: Option<String>,
    pub gerencia: Option<String>,
    pub area: Option<String>,
    pub banco: Option<String>,
    pub cuenta_bancaria: Option<String>,
    pub phone: Option<String>,
    pub estado: bool,
}

/// Input for creating a user.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password: String,
    pub role: Option<UserRole>,
    pub id_empresa: Option<i64>,
    pub dni: Option<String>,
    pub cargo: Option<String>,
    pub ceco: Option<String>,
    pub gerencia: Option<String>,
    pub area: Option<String>,
    pub banco: Option<String>,
    pub cuenta_bancaria: Option<String>,
    pub phone: Option<String>,
}

/// Partial edit of a user; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub full_name: Option<String>,
    /// New password, hashed before storage.
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub id_empresa: Option<i64>,
    pub dni: Option<String>,
    pub cargo: Option<String>,
    pub ceco: Option<String>,
    pub gerencia: Option<String>,
    pub area: Option<String>,
    pub banco: Option<String>,
    pub cuenta_bancaria: Option<String>,
    pub phone: Option<String>,
    /// `false` deactivates the account.
    pub estado: Option<bool>,
}

/// A tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub ruc: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
}

/// Input for creating a company.
#[derive(Debug, Clone, Default, Deserialize, TS)]
#[ts(export)]
pub struct NewCompany {
    pub name: String,
    pub ruc: Option<String>,
    pub description: Option<String>,
    pub logo: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
