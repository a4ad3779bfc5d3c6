//! # Sequence Codes
//!
//! Human-readable codes for rendiciones (`R00001`) and solicitudes
//! (`S00001`).
//!
//! ## Allocation Flow
//! ```text
//! latest stored code for (user, kind)
//!      │
//!      ├── none ──────────► SequenceCode::first(kind)      → R00001
//!      │
//!      └── "R00041" ──► parse ──► next() ──────────────────► R00042
//!                                   │
//!                                   └── R99999 → SequenceExhausted
//! ```
//!
//! The width is fixed, so the lexicographic order of stored codes equals
//! their numeric order and `ORDER BY nombre DESC` finds the latest one.
//! Persisting the code and resolving races is the database layer's job.

use std::fmt;

use crate::error::{CoreError, CoreResult};
use crate::types::SequenceKind;
use crate::{CODE_WIDTH, MAX_SEQUENCE_NUMBER};

/// A parsed `^[RS]\d{5}$` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceCode {
    kind: SequenceKind,
    number: u32,
}

impl SequenceCode {
    /// Builds a code, rejecting 0 and numbers that need more than 5 digits.
    pub fn new(kind: SequenceKind, number: u32) -> CoreResult<Self> {
        if number == 0 || number > MAX_SEQUENCE_NUMBER {
            return Err(CoreError::MalformedCode(format!(
                "{}{}",
                kind.prefix(),
                number
            )));
        }
        Ok(SequenceCode { kind, number })
    }

    /// First code of a kind: `R00001` or `S00001`.
    pub const fn first(kind: SequenceKind) -> Self {
        SequenceCode { kind, number: 1 }
    }

    /// Parses a stored code.
    ///
    /// ## Example
    /// ```rust
    /// use arendir_core::sequence::SequenceCode;
    /// use arendir_core::SequenceKind;
    ///
    /// let code = SequenceCode::parse("R00042").unwrap();
    /// assert_eq!(code.kind(), SequenceKind::Rendicion);
    /// assert_eq!(code.number(), 42);
    /// assert!(SequenceCode::parse("R42").is_err());
    /// ```
    pub fn parse(code: &str) -> CoreResult<Self> {
        let malformed = || CoreError::MalformedCode(code.to_string());

        let mut chars = code.chars();
        let kind = chars
            .next()
            .and_then(SequenceKind::from_prefix)
            .ok_or_else(malformed)?;

        let digits = chars.as_str();
        if digits.len() != CODE_WIDTH || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(malformed());
        }

        let number: u32 = digits.parse().map_err(|_| malformed())?;
        SequenceCode::new(kind, number).map_err(|_| malformed())
    }

    /// Parses a stored code and checks it belongs to `kind`.
    pub fn parse_for(code: &str, kind: SequenceKind) -> CoreResult<Self> {
        let parsed = SequenceCode::parse(code)?;
        if parsed.kind != kind {
            return Err(CoreError::MalformedCode(code.to_string()));
        }
        Ok(parsed)
    }

    /// The code after this one.
    pub fn next(&self) -> CoreResult<Self> {
        if self.number >= MAX_SEQUENCE_NUMBER {
            return Err(CoreError::SequenceExhausted {
                kind: self.kind,
                last: self.to_string(),
            });
        }
        Ok(SequenceCode {
            kind: self.kind,
            number: self.number + 1,
        })
    }

    /// Code that follows `latest`, or the first one when there is none.
    pub fn after(kind: SequenceKind, latest: Option<&str>) -> CoreResult<Self> {
        match latest {
            None => Ok(SequenceCode::first(kind)),
            Some(code) => SequenceCode::parse_for(code, kind)?.next(),
        }
    }

    #[inline]
    pub const fn kind(&self) -> SequenceKind {
        self.kind
    }

    #[inline]
    pub const fn number(&self) -> u32 {
        self.number
    }
}

impl fmt::Display for SequenceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:0width$}",
            self.kind.prefix(),
            self.number,
            width = CODE_WIDTH
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
