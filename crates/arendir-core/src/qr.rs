//! # QR Token Classification
//!
//! Turns the pipe-delimited text decoded from a SUNAT receipt QR into form
//! fields. Decoding the image itself happens outside this crate.
//!
//! ```text
//! 20123456789|01|F001|00004567|18.00|118.00|2024-03-05|6|45127890|
//!      │       │   │      │       │      │        │          │
//!     ruc    tipo serie numero   igv   total    fecha       dni
//! ```
//!
//! Token order varies between issuers, so each token is classified by its
//! shape rather than its position (except the leading RUC).

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

static RUC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{11}$").expect("hardcoded regex should be valid"));
static EIGHT_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}$").expect("hardcoded regex should be valid"));
static TWO_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}$").expect("hardcoded regex should be valid"));
static SERIE_NUMERO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9]{4})-(\d{7,8})$").expect("hardcoded regex should be valid")
});
static SERIE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{1,3}\d{1,3}$").expect("hardcoded regex should be valid"));
static NUMERO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4,8}$").expect("hardcoded regex should be valid"));
static AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\d{1,2}$").expect("hardcoded regex should be valid"));

/// Fields recognised in a QR payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QrFields {
    pub ruc: Option<String>,
    /// Display name, e.g. `Factura`.
    pub tipo_documento: Option<String>,
    pub serie: Option<String>,
    /// Zero-padded to 8 digits.
    pub numero: Option<String>,
    pub dni: Option<String>,
    #[ts(as = "Option<String>")]
    pub fecha: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub total: Option<Money>,
    #[ts(as = "Option<String>")]
    pub igv: Option<Money>,
    #[ts(as = "Option<String>")]
    pub sub_total: Option<Money>,
}

/// SUNAT catalogue 01 code to display name.
pub fn document_type_name(code: &str) -> &'static str {
    match code {
        "01" => "Factura",
        "02" => "Recibo por Honorarios",
        "03" => "Boleta de Venta",
        "05" => "Boleto Aéreo",
        "07" => "Nota de Crédito",
        "08" => "Nota de Débito",
        "12" => "Ticket",
        "14" => "Recibo Servicio Público",
        _ => "Desconocido",
    }
}

fn parse_date(token: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(token, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(token, "%d/%m/%Y"))
        .ok()
}

fn pad_numero(digits: &str) -> String {
    format!("{:0>8}", digits)
}

/// Classifies every token of a raw QR payload.
///
/// ## Rules
/// - The first token is the RUC when it has 11 digits
/// - `XXXX-1234567` gives serie and numero
/// - `B205`-style tokens are a bare serie
/// - The first 8-digit token is the numero, a later one is the DNI
/// - A 4-8 digit token is the numero when none was seen yet
/// - Decimal tokens are amounts: the largest is the total, then sub_total
///   and igv in decreasing order; with only two, the smaller is the igv
///
/// ## Example
/// ```rust
/// use arendir_core::qr::parse_qr;
///
/// let fields = parse_qr("20123456789|01|F001|4567|18.00|118.00|05/03/2024");
/// assert_eq!(fields.tipo_documento.as_deref(), Some("Factura"));
/// assert_eq!(fields.numero.as_deref(), Some("00004567"));
/// assert_eq!(fields.total.unwrap().to_string(), "118.00");
/// ```
pub fn parse_qr(raw: &str) -> QrFields {
    let tokens: Vec<&str> = raw.split('|').map(str::trim).collect();
    let mut fields = QrFields::default();
    let mut amounts: Vec<Money> = Vec::new();
    let mut has_serie = false;

    if let Some(first) = tokens.first() {
        if RUC.is_match(first) {
            fields.ruc = Some(first.to_string());
        }
    }

    for token in tokens.iter().skip(1).copied() {
        if EIGHT_DIGITS.is_match(token) && !has_serie && fields.numero.is_none() {
            fields.numero = Some(token.to_string());
        } else if EIGHT_DIGITS.is_match(token) && fields.numero.is_some() {
            fields.dni = Some(token.to_string());
        } else if TWO_DIGITS.is_match(token) {
            fields.tipo_documento = Some(document_type_name(token).to_string());
        } else if let Some(caps) = SERIE_NUMERO.captures(token) {
            fields.serie = Some(caps[1].to_string());
            fields.numero = Some(pad_numero(&caps[2]));
            has_serie = true;
        } else if SERIE.is_match(token) {
            fields.serie = Some(token.to_string());
            has_serie = true;
        } else if NUMERO.is_match(token) && fields.numero.is_none() {
            fields.numero = Some(pad_numero(token));
        } else if AMOUNT.is_match(token) {
            if let Ok(amount) = Money::parse_decimal(token) {
                amounts.push(amount);
            }
        } else if let Some(date) = parse_date(token) {
            fields.fecha = Some(date);
        }
    }

    amounts.sort_unstable_by(|a, b| b.cmp(a));
    match amounts.as_slice() {
        [] => {}
        [total] => fields.total = Some(*total),
        [total, igv] => {
            fields.total = Some(*total);
            fields.igv = Some(*igv);
        }
        [total, sub_total, igv, ..] => {
            fields.total = Some(*total);
            fields.sub_total = Some(*sub_total);
            fields.igv = Some(*igv);
        }
    }

    fields
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_factura() {
        let fields = parse_qr("20123456789|01|F001-0004567|18.00|118.00|2024-03-05|6|45127890|");
        assert_eq!(fields.ruc.as_deref(), Some("20123456789"));
        assert_eq!(fields.tipo_documento.as_deref(), Some("Factura"));
        assert_eq!(fields.serie.as_deref(), Some("F001"));
        assert_eq!(fields.numero.as_deref(), Some("00004567"));
        assert_eq!(fields.dni.as_deref(), Some("45127890"));
        assert_eq!(fields.fecha, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(fields.total, Some(Money::from_cents(11800)));
        assert_eq!(fields.igv, Some(Money::from_cents(1800)));
        assert_eq!(fields.sub_total, None);
    }

    #[test]
    fn test_three_amounts() {
        let fields = parse_qr("20123456789|03|B205|123|100.00|18.00|118.00|05/03/2024");
        assert_eq!(fields.tipo_documento.as_deref(), Some("Boleta de Venta"));
        assert_eq!(fields.serie.as_deref(), Some("B205"));
        assert_eq!(fields.total, Some(Money::from_cents(11800)));
        assert_eq!(fields.sub_total, Some(Money::from_cents(10000)));
        assert_eq!(fields.igv, Some(Money::from_cents(1800)));
    }

    #[test]
    fn test_bare_numero_is_padded() {
        let fields = parse_qr("20123456789|12|E001|98765");
        assert_eq!(fields.numero.as_deref(), Some("00098765"));
        assert_eq!(fields.tipo_documento.as_deref(), Some("Ticket"));
    }

    #[test]
    fn test_unknown_type_and_missing_ruc() {
        let fields = parse_qr("123|99");
        assert_eq!(fields.ruc, None);
        assert_eq!(fields.tipo_documento.as_deref(), Some("Desconocido"));
    }

    #[test]
    fn test_empty_payload() {
        assert_eq!(parse_qr(""), QrFields::default());
    }
}
