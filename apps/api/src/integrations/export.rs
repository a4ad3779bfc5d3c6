//! # Report Export
//!
//! Renders a [`ReconciliationResult`] into a downloadable file.
//!
//! ## Layout of the spreadsheet export
//! ```text
//! Colaborador, Ana Quispe           ◄── header block (who, which report)
//! DNI, 45127890
//! ...
//! Rendicion, R00001
//! Solicitudes, S00001
//!
//! Gastos                            ◄── counted expense lines
//! Fecha, RUC, Proveedor, ..., Total
//!
//! Anticipos                         ◄── counted advance lines
//! Fecha, Motivo, ..., Total
//!
//! Total gasto, 200.00               ◄── totals and who pays whom
//! Total anticipo, 500.00
//! Reembolso, -300.00
//! ```
//!
//! PDF rendering is an external collaborator: register an implementation of
//! [`ReportRenderer`] for [`ExportFormat::Pdf`] to enable it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::IntegrationError;
use arendir_core::reconciliation::ReconciliationResult;
use arendir_core::{Documento, Settlement};

/// Output formats clients can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Excel,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Pdf => write!(f, "pdf"),
            ExportFormat::Excel => write!(f, "excel"),
        }
    }
}

/// A rendered file, ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
}

/// Turns a reconciliation into a file.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, result: &ReconciliationResult) -> Result<RenderedReport, IntegrationError>;
}

/// Renderers by format.
#[derive(Clone, Default)]
pub struct RendererRegistry {
    renderers: HashMap<ExportFormat, Arc<dyn ReportRenderer>>,
}

impl RendererRegistry {
    /// Registry with the built-in renderers (spreadsheet only).
    pub fn with_defaults() -> Self {
        let mut registry = Self::default();
        registry.register(ExportFormat::Excel, Arc::new(CsvReportRenderer));
        registry
    }

    pub fn register(&mut self, format: ExportFormat, renderer: Arc<dyn ReportRenderer>) {
        self.renderers.insert(format, renderer);
    }

    /// The renderer for `format`, or `Unavailable` if none is registered.
    pub fn get(&self, format: ExportFormat) -> Result<Arc<dyn ReportRenderer>, IntegrationError> {
        self.renderers.get(&format).cloned().ok_or_else(|| {
            IntegrationError::unavailable("renderer", format!("no {} renderer configured", format))
        })
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererRegistry")
            .field("formats", &self.renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

// =============================================================================
// CSV
// =============================================================================

/// Spreadsheet export as CSV (opens directly in Excel).
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReportRenderer;

const EXPENSE_COLUMNS: &[&str] = &[
    "Fecha",
    "RUC",
    "Proveedor",
    "Tipo documento",
    "Serie",
    "Correlativo",
    "Tipo gasto",
    "Moneda",
    "Total",
];

const ADVANCE_COLUMNS: &[&str] = &["Fecha", "Solicitud", "Motivo", "Moneda", "Total"];

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn date(value: Option<chrono::NaiveDate>) -> String {
    value.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_default()
}

fn expense_row(doc: &Documento) -> Vec<String> {
    vec![
        date(doc.fecha_emision),
        text(&doc.ruc).to_string(),
        text(&doc.proveedor).to_string(),
        text(&doc.tipo_documento).to_string(),
        text(&doc.serie).to_string(),
        text(&doc.correlativo).to_string(),
        text(&doc.tipo_gasto).to_string(),
        doc.moneda.clone(),
        doc.total_or_zero().to_string(),
    ]
}

fn advance_row(doc: &Documento) -> Vec<String> {
    vec![
        date(doc.fecha_solicitud),
        doc.numero_rendicion.clone(),
        text(&doc.motivo).to_string(),
        doc.moneda.clone(),
        doc.total_or_zero().to_string(),
    ]
}

fn settlement_label(settlement: Settlement) -> &'static str {
    match settlement {
        Settlement::EmployeeOwed => "La empresa reembolsa al colaborador",
        Settlement::EmployeeOwes => "El colaborador devuelve a la empresa",
        Settlement::Settled => "Sin saldo pendiente",
    }
}

impl CsvReportRenderer {
    fn write(&self, result: &ReconciliationResult) -> Result<Vec<u8>, csv::Error> {
        let mut out = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        let header = &result.header;

        out.write_record(["Colaborador", header.full_name.as_str()])?;
        out.write_record(["DNI", text(&header.dni)])?;
        out.write_record(["Cargo", text(&header.cargo)])?;
        out.write_record(["CECO", text(&header.ceco)])?;
        out.write_record(["Gerencia", text(&header.gerencia)])?;
        out.write_record(["Empresa", text(&header.empresa)])?;
        out.write_record(["Rendicion", result.rendicion.nombre.as_str()])?;
        out.write_record(["Solicitudes", result.solicitudes.join(" ").as_str()])?;
        out.write_record([""])?;

        out.write_record(["Gastos"])?;
        out.write_record(EXPENSE_COLUMNS)?;
        for doc in &result.gastos {
            out.write_record(expense_row(doc))?;
        }
        out.write_record([""])?;

        out.write_record(["Anticipos"])?;
        out.write_record(ADVANCE_COLUMNS)?;
        for doc in &result.anticipos {
            out.write_record(advance_row(doc))?;
        }
        out.write_record([""])?;

        let totals = &result.totals;
        out.write_record(["Total gasto", totals.total_gasto.to_string().as_str()])?;
        out.write_record(["Total anticipo", totals.total_anticipo.to_string().as_str()])?;
        out.write_record(["Reembolso", totals.reembolso.to_string().as_str()])?;
        out.write_record([
            settlement_label(result.settlement),
            totals.settlement_amount().to_string().as_str(),
        ])?;

        out.into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))
    }
}

impl ReportRenderer for CsvReportRenderer {
    fn render(&self, result: &ReconciliationResult) -> Result<RenderedReport, IntegrationError> {
        let bytes = self
            .write(result)
            .map_err(|e| IntegrationError::unavailable("renderer", e.to_string()))?;
        Ok(RenderedReport {
            bytes,
            content_type: "text/csv; charset=utf-8",
            extension: "csv",
        })
    }
}
