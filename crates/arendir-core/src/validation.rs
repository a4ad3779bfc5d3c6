//! # Validation Module
//!
//! Input validation for Arendir.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractors (serde)                                      │
//! │  ├── Types, enums, decimal amounts                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── RUC / DNI / serie / correlativo formats                           │
//! │  └── Currency codes, non-negative amounts                              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE (id_user, kind, nombre), UNIQUE link pairs                 │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use arendir_core::validation::{validate_ruc, validate_dni};
//!
//! assert!(validate_ruc("20123456789").is_ok());
//! assert!(validate_dni("4512").is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{NewDocumento, NewUser, UserUpdate};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Currencies accepted on documents.
pub const ALLOWED_CURRENCIES: &[&str] = &["PEN", "USD", "EUR"];

// =============================================================================
// Identity Validators
// =============================================================================

fn exact_digits(field: &str, value: &str, len: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::format(field, "must contain only digits"));
    }

    if value.len() != len {
        return Err(ValidationError::WrongLength {
            field: field.to_string(),
            len,
        });
    }

    Ok(())
}

/// Validates a RUC (taxpayer number): exactly 11 digits.
pub fn validate_ruc(ruc: &str) -> ValidationResult<()> {
    exact_digits("ruc", ruc, 11)
}

/// Validates a DNI (national id): exactly 8 digits.
pub fn validate_dni(dni: &str) -> ValidationResult<()> {
    exact_digits("dni", dni, 8)
}

/// Validates a document serie such as `F001`, `B123` or `E001`.
///
/// ## Rules
/// - 1 to 4 characters
/// - Letters and digits only
pub fn validate_serie(serie: &str) -> ValidationResult<()> {
    let serie = serie.trim();

    if serie.is_empty() {
        return Err(ValidationError::Required {
            field: "serie".to_string(),
        });
    }

    if serie.len() > 4 {
        return Err(ValidationError::TooLong {
            field: "serie".to_string(),
            max: 4,
        });
    }

    if !serie.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::format(
            "serie",
            "must contain only letters and digits",
        ));
    }

    Ok(())
}

/// Validates a correlativo: 1 to 8 digits.
pub fn validate_correlativo(correlativo: &str) -> ValidationResult<()> {
    let correlativo = correlativo.trim();

    if correlativo.is_empty() {
        return Err(ValidationError::Required {
            field: "correlativo".to_string(),
        });
    }

    if correlativo.len() > 8 {
        return Err(ValidationError::TooLong {
            field: "correlativo".to_string(),
            max: 8,
        });
    }

    if !correlativo.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::format("correlativo", "must contain only digits"));
    }

    Ok(())
}

/// Validates an ISO currency code and returns it uppercased.
pub fn validate_moneda(moneda: &str) -> ValidationResult<String> {
    let moneda = moneda.trim().to_uppercase();

    if !ALLOWED_CURRENCIES.contains(&moneda.as_str()) {
        return Err(ValidationError::NotAllowed {
            field: "moneda".to_string(),
            allowed: ALLOWED_CURRENCIES.iter().map(|c| c.to_string()).collect(),
        });
    }

    Ok(moneda)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Rejects negative amounts and amounts above [`Money::MAX`]. `None` is accepted.
pub fn validate_amount(field: &str, amount: Option<Money>) -> ValidationResult<()> {
    match amount {
        Some(m) if m.is_negative() => Err(ValidationError::Negative {
            field: field.to_string(),
        }),
        Some(m) if m > Money::MAX => Err(ValidationError::OutOfRange {
            field: field.to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Composite Validators
// =============================================================================

/// Validates every present field of a new document.
///
/// Empty strings are treated as absent so OCR forms can post blank fields.
pub fn validate_new_documento(doc: &NewDocumento) -> ValidationResult<()> {
    fn present(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    if let Some(ruc) = present(&doc.ruc) {
        validate_ruc(ruc)?;
    }
    if let Some(dni) = present(&doc.dni) {
        validate_dni(dni)?;
    }
    if let Some(serie) = present(&doc.serie) {
        validate_serie(serie)?;
    }
    if let Some(correlativo) = present(&doc.correlativo) {
        validate_correlativo(correlativo)?;
    }
    if let Some(moneda) = present(&doc.moneda) {
        validate_moneda(moneda)?;
    }

    validate_amount("sub_total", doc.sub_total)?;
    validate_amount("igv", doc.igv)?;
    validate_amount("no_gravadas", doc.no_gravadas)?;
    validate_amount("importe_facturado", doc.importe_facturado)?;
    validate_amount("total", doc.total)?;

    if let (Some(total), Some(igv)) = (doc.total, doc.igv) {
        if igv > total {
            return Err(ValidationError::format("igv", "cannot exceed total"));
        }
    }

    Ok(())
}

/// Minimal address check: something before `@`, a dot after it.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(ValidationError::format("email", "not an email address")),
    }
}

fn validate_password(password: &str) -> ValidationResult<()> {
    if password.len() < 8 {
        return Err(ValidationError::format("password", "must be at least 8 characters"));
    }
    Ok(())
}

/// Validates a signup / admin-created user.
pub fn validate_new_user(user: &NewUser) -> ValidationResult<()> {
    validate_email(&user.email)?;

    if user.full_name.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "full_name".to_string(),
        });
    }

    validate_password(&user.password)?;

    if let Some(dni) = user.dni.as_deref().filter(|d| !d.trim().is_empty()) {
        validate_dni(dni)?;
    }

    Ok(())
}

/// Validates the fields a user edit actually sets.
pub fn validate_user_update(update: &UserUpdate) -> ValidationResult<()> {
    if let Some(email) = &update.email {
        validate_email(email)?;
    }
    if update.full_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ValidationError::Required {
            field: "full_name".to_string(),
        });
    }
    if let Some(password) = &update.password {
        validate_password(password)?;
    }
    if let Some(dni) = update.dni.as_deref().filter(|d| !d.trim().is_empty()) {
        validate_dni(dni)?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_ruc() {
        assert!(validate_ruc("20123456789").is_ok());
        assert!(validate_ruc(" 10456789012 ").is_ok());

        assert!(matches!(validate_ruc(""), Err(ValidationError::Required { .. })));
        assert!(matches!(
            validate_ruc("2012345678"),
            Err(ValidationError::WrongLength { len: 11, .. })
        ));
        assert!(validate_ruc("2012345678X").is_err());
    }

    #[test]
    fn test_validate_dni() {
        assert!(validate_dni("45127890").is_ok());
        assert!(validate_dni("4512789").is_err());
        assert!(validate_dni("451278901").is_err());
    }

    #[test]
    fn test_validate_serie_and_correlativo() {
        assert!(validate_serie("F001").is_ok());
        assert!(validate_serie("E1").is_ok());
        assert!(validate_serie("F0001").is_err());
        assert!(validate_serie("F-01").is_err());

        assert!(validate_correlativo("00012345").is_ok());
        assert!(validate_correlativo("123456789").is_err());
        assert!(validate_correlativo("12A").is_err());
    }

    #[test]
    fn test_validate_moneda() {
        assert_eq!(validate_moneda("pen").unwrap(), "PEN");
        assert!(validate_moneda("BTC").is_err());
    }

    #[test]
    fn test_validate_new_documento() {
        let mut doc = NewDocumento {
            ruc: Some("20123456789".into()),
            serie: Some("F001".into()),
            correlativo: Some("".into()),
            total: Some(Money::from_cents(11800)),
            igv: Some(Money::from_cents(1800)),
            ..Default::default()
        };
        assert!(validate_new_documento(&doc).is_ok());

        doc.total = Some(Money::from_cents(-1));
        assert!(matches!(
            validate_new_documento(&doc),
            Err(ValidationError::Negative { .. })
        ));

        doc.total = Some(Money::from_cents(1000));
        assert!(validate_new_documento(&doc).is_err());
    }

    #[test]
    fn test_amount_cap() {
        assert!(validate_amount("total", Some(Money::MAX)).is_ok());
        assert!(matches!(
            validate_amount("total", Some(Money::from_cents(Money::MAX.cents() + 1))),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_amount("igv", Some(Money::from_cents(i64::MAX))),
            Err(ValidationError::OutOfRange { ref field }) if field == "igv"
        ));
    }

    #[test]
    fn test_validate_new_user() {
        let mut user = NewUser {
            email: "ana@empresa.pe".into(),
            full_name: "Ana Quispe".into(),
            password: "s3cret-pass".into(),
            ..Default::default()
        };
        assert!(validate_new_user(&user).is_ok());

        user.email = "ana".into();
        assert!(validate_new_user(&user).is_err());

        user.email = "ana@empresa.pe".into();
        user.password = "short".into();
        assert!(validate_new_user(&user).is_err());
    }

    #[test]
    fn test_validate_user_update() {
        assert!(validate_user_update(&UserUpdate::default()).is_ok());

        let rename = UserUpdate {
            full_name: Some("Ana María Quispe".into()),
            ..Default::default()
        };
        assert!(validate_user_update(&rename).is_ok());

        let blank_name = UserUpdate {
            full_name: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            validate_user_update(&blank_name),
            Err(ValidationError::Required { .. })
        ));

        let bad_email = UserUpdate {
            email: Some("ana.empresa.pe".into()),
            ..Default::default()
        };
        assert!(validate_user_update(&bad_email).is_err());

        let short_password = UserUpdate {
            password: Some("1234".into()),
            ..Default::default()
        };
        assert!(validate_user_update(&short_password).is_err());
    }
}
