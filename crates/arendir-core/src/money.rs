//! # Money Module
//!
//! Provides the `Money` type for monetary values and `ExchangeRate` for the
//! `tc` column of documents.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    120.50 + 79.50 - 500.00 as binary floats drifts after many rows      │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    12050 + 7950 - 50000 = -30000 cents = -300.00 exactly                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! Amounts travel as decimal strings (`"120.50"`). Deserialization also
//! accepts JSON numbers with at most two decimals; anything finer is
//! rejected rather than rounded.
//!
//! ## Usage
//! ```rust
//! use arendir_core::money::Money;
//!
//! let gasto = Money::parse_decimal("120.50").unwrap() + Money::from_cents(7950);
//! assert_eq!(gasto.to_string(), "200.00");
//! ```

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in cents (céntimos).
///
/// Signed: a negative reimbursement means the employee owes the company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Largest amount a single document field may carry: 100 000 000 000.00.
    ///
    /// Keeps a report's sums far from `i64` limits.
    pub const MAX: Money = Money(10_000_000_000_000);

    /// Creates a Money value from cents.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole units and cents.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Parses a plain decimal such as `"120.50"`, `"-3.5"` or `"42"`.
    ///
    /// ## Rules
    /// - Optional leading `-`
    /// - At most two decimals (no rounding)
    /// - No thousands separators, no currency symbol
    ///
    /// ## Example
    /// ```rust
    /// use arendir_core::money::Money;
    ///
    /// assert_eq!(Money::parse_decimal("79.5").unwrap().cents(), 7950);
    /// assert!(Money::parse_decimal("1.005").is_err());
    /// ```
    pub fn parse_decimal(input: &str) -> Result<Self, ValidationError> {
        let cents = parse_fixed(input, 2, "amount")?;
        Ok(Money(cents))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (truncated toward zero).
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Adds two amounts, `None` on `i64` overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Subtracts two amounts, `None` on `i64` overflow.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums amounts, failing instead of wrapping when the total leaves `i64`.
    pub fn try_sum<I>(field: &str, amounts: I) -> Result<Money, ValidationError>
    where
        I: IntoIterator<Item = Money>,
    {
        amounts.into_iter().try_fold(Money::zero(), |acc, m| {
            acc.checked_add(m)
                .ok_or_else(|| ValidationError::OutOfRange { field: field.to_string() })
        })
    }

    /// Converts a foreign-currency amount to local currency.
    ///
    /// Rounds half away from zero to the nearest cent.
    ///
    /// ## Errors
    /// `OutOfRange` when the converted amount does not fit in cents.
    ///
    /// ## Example
    /// ```rust
    /// use arendir_core::money::{ExchangeRate, Money};
    ///
    /// let usd = Money::from_cents(1000); // 10.00 USD
    /// let rate = ExchangeRate::parse("3.7525").unwrap();
    /// assert_eq!(usd.convert(rate).unwrap().cents(), 3753); // 37.53 PEN
    /// ```
    pub fn convert(&self, rate: ExchangeRate) -> Result<Money, ValidationError> {
        let scaled = i128::from(self.0) * i128::from(rate.ten_thousandths());
        let half = if scaled < 0 { -5_000 } else { 5_000 };
        i64::try_from((scaled + half) / 10_000)
            .map(Money)
            .map_err(|_| ValidationError::OutOfRange { field: "total".to_string() })
    }
}

/// Shows money as a plain decimal with two places: `-300.00`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.cents_part())
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse_decimal(s)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor { places: 2 }).map(Money)
    }
}

// =============================================================================
// Exchange Rate
// =============================================================================

/// Exchange rate in ten-thousandths (`3.7525` is stored as `37525`).
///
/// SUNAT publishes rates with up to four decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct ExchangeRate(i64);

impl ExchangeRate {
    /// Rate of a document already in local currency.
    pub const ONE: ExchangeRate = ExchangeRate(10_000);

    #[inline]
    pub const fn from_ten_thousandths(value: i64) -> Self {
        ExchangeRate(value)
    }

    /// Parses a decimal rate with at most four decimals.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let value = parse_fixed(input, 4, "tipo_cambio")?;
        if value <= 0 {
            return Err(ValidationError::format("tipo_cambio", "must be positive"));
        }
        Ok(ExchangeRate(value))
    }

    #[inline]
    pub const fn ten_thousandths(&self) -> i64 {
        self.0
    }
}

impl Default for ExchangeRate {
    fn default() -> Self {
        ExchangeRate::ONE
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:04}", self.0 / 10_000, self.0 % 10_000)
    }
}

impl Serialize for ExchangeRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExchangeRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = deserializer.deserialize_any(DecimalVisitor { places: 4 })?;
        if value <= 0 {
            return Err(de::Error::custom("tipo_cambio must be positive"));
        }
        Ok(ExchangeRate(value))
    }
}

// =============================================================================
// Fixed-point parsing
// =============================================================================

/// Parses `input` into an integer scaled by `10^places`.
fn parse_fixed(input: &str, places: u32, field: &str) -> Result<i64, ValidationError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };

    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::format(field, format!("'{}' is not a decimal", input)));
    }
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::format(field, format!("'{}' is not a decimal", input)));
    }
    if frac.len() > places as usize {
        return Err(ValidationError::format(
            field,
            format!("at most {} decimals allowed", places),
        ));
    }

    let scale = 10_i64.pow(places);
    let whole: i64 = whole
        .parse()
        .map_err(|_| ValidationError::format(field, "value out of range"))?;
    let frac_value: i64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", frac, width = places as usize);
        padded
            .parse()
            .map_err(|_| ValidationError::format(field, "value out of range"))?
    };

    let value = whole
        .checked_mul(scale)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(|| ValidationError::format(field, "value out of range"))?;

    Ok(if negative { -value } else { value })
}

/// Accepts decimal strings and JSON numbers, scaled by `10^places`.
struct DecimalVisitor {
    places: u32,
}

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = i64;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a decimal with at most {} places", self.places)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
        parse_fixed(v, self.places, "amount").map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
        v.checked_mul(10_i64.pow(self.places))
            .ok_or_else(|| E::custom("amount out of range"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
        let v = i64::try_from(v).map_err(|_| E::custom("amount out of range"))?;
        self.visit_i64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
        // The shortest round-trip representation is what the client typed.
        parse_fixed(&v.to_string(), self.places, "amount").map_err(E::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
