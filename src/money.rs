//! Money Module
//!
//! Fixed-point currency amounts. All balances, deltas and transfer amounts go
//! through [`Money`]; floating point never touches a monetary value.
//!
//! ## Representation
//! - In memory: `rust_decimal::Decimal`, always rescaled to [`SCALE`] (2)
//! - In PostgreSQL: `NUMERIC(20,2)`
//! - On the wire: a JSON string such as `"100.50"`
//!
//! ## Usage
//! ```rust
//! use corebank::money::Money;
//!
//! let amount = Money::parse("100.5").unwrap();
//! assert_eq!(amount.to_string(), "100.50");
//! ```

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Minor-unit digits carried by every amount (kopecks / cents)
pub const SCALE: u32 = 2;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: at most {max} decimal places allowed")]
    PrecisionOverflow { max: u32 },

    #[error("Amount cannot be negative")]
    Negative,

    #[error("Amount too large")]
    Overflow,

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

// ============================================================================
// Money
// ============================================================================

/// Non-negative fixed-point amount with exactly two fractional digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Upper bound for a single amount: 999 999 999 999.99
    pub fn max_value() -> Money {
        Money(Decimal::new(99_999_999_999_999, SCALE))
    }

    /// Build from a decimal, rejecting sub-kopeck precision, negatives and
    /// values above [`Money::max_value`]
    pub fn from_decimal(value: Decimal) -> Result<Self, MoneyError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MoneyError::Negative);
        }
        let normalized = value.normalize();
        if normalized.scale() > SCALE {
            return Err(MoneyError::PrecisionOverflow { max: SCALE });
        }
        let mut scaled = normalized;
        scaled.rescale(SCALE);
        if scaled > Self::max_value().0 {
            return Err(MoneyError::Overflow);
        }
        Ok(Money(scaled))
    }

    /// Strict client-format parsing
    ///
    /// - Rejects empty input, `.5`, `5.`, `+5`, `-5` and scientific notation
    /// - Rejects more than two fractional digits (no silent rounding)
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        if s.is_empty() {
            return Err(MoneyError::InvalidFormat("amount cannot be empty".into()));
        }
        if s.starts_with('.') {
            return Err(MoneyError::InvalidFormat("use 0.5 not .5".into()));
        }
        if s.ends_with('.') {
            return Err(MoneyError::InvalidFormat("use 5.0 not 5.".into()));
        }
        if s.contains(['e', 'E']) {
            return Err(MoneyError::InvalidFormat(
                "scientific notation not allowed".into(),
            ));
        }
        if s.starts_with('+') {
            return Err(MoneyError::InvalidFormat("+ prefix not allowed".into()));
        }
        if s.starts_with('-') {
            return Err(MoneyError::Negative);
        }
        if !s.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return Err(MoneyError::InvalidFormat(format!("not a decimal: {}", s)));
        }
        let d = Decimal::from_str(s).map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;
        Self::from_decimal(d)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Signed delta that credits this amount
    pub fn credit(&self) -> Decimal {
        self.0
    }

    /// Signed delta that debits this amount
    pub fn debit(&self) -> Decimal {
        -self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Money {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // String keeps precision intact across JSON parsers
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        // JSON numbers would go through f64 before we ever see them
        let s = String::deserialize(deserializer)?;
        Money::parse(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normal_cases() {
        assert_eq!(Money::parse("100.50").unwrap().to_string(), "100.50");
        assert_eq!(Money::parse("100.5").unwrap().to_string(), "100.50");
        assert_eq!(Money::parse("1").unwrap().to_string(), "1.00");
        assert_eq!(Money::parse("0.01").unwrap().to_string(), "0.01");
        // Trailing zeros beyond the scale are not extra precision
        assert_eq!(Money::parse("2.500").unwrap().to_string(), "2.50");
    }

    #[test]
    fn test_parse_rejects_bad_format() {
        assert!(matches!(
            Money::parse(""),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            Money::parse(".5"),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            Money::parse("5."),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            Money::parse("1e3"),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            Money::parse("+5"),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            Money::parse("1,000"),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert_eq!(Money::parse("-5"), Err(MoneyError::Negative));
    }

    #[test]
    fn test_parse_rejects_sub_minor_precision() {
        assert_eq!(
            Money::parse("0.001"),
            Err(MoneyError::PrecisionOverflow { max: 2 })
        );
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(Money::parse("999999999999.99").is_ok());
        assert_eq!(
            Money::parse("1000000000000.00"),
            Err(MoneyError::Overflow)
        );
    }

    #[test]
    fn test_no_float_drift() {
        // 0.1 + 0.2 is exactly 0.3 here
        let a = Money::parse("0.10").unwrap();
        let b = Money::parse("0.20").unwrap();
        let sum = Money::from_decimal(a.as_decimal() + b.as_decimal()).unwrap();
        assert_eq!(sum, Money::parse("0.30").unwrap());
    }

    #[test]
    fn test_serde_uses_strings() {
        let m = Money::parse("100.5").unwrap();
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"100.50\"");
        let back: Money = serde_json::from_str("\"100.50\"").unwrap();
        assert_eq!(back, m);
        // Numbers are rejected
        assert!(serde_json::from_str::<Money>("100.5").is_err());
    }

    #[test]
    fn test_debit_credit_deltas() {
        let m = Money::parse("3.25").unwrap();
        assert_eq!(m.credit(), Decimal::new(325, 2));
        assert_eq!(m.debit(), Decimal::new(-325, 2));
    }
}
