//! Input validation for account opening
//!
//! Validated types keep their fields private so the only way to obtain one
//! is through the checking constructor.

use std::fmt;

use crate::ledger::DEFAULT_CURRENCY;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Currency code must be uppercase: got '{got}', expected '{expected}'")]
    CurrencyNotUppercase { got: String, expected: String },

    #[error("Invalid format for {field}: '{value}' (expected: {expected})")]
    InvalidFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// ISO-4217 style currency code (three ASCII uppercase letters)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// # Validation Rules
    /// - Exactly three letters A-Z
    /// - Lowercase input is rejected, not folded
    ///
    /// # Examples
    /// ```
    /// use corebank::account::validation::CurrencyCode;
    ///
    /// assert_eq!(CurrencyCode::new("USD").unwrap().as_str(), "USD");
    /// assert!(CurrencyCode::new("usd").is_err());
    /// ```
    pub fn new(code: &str) -> Result<Self, ValidationError> {
        let code = code.trim();

        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidFormat {
                field: "currency",
                value: code.to_string(),
                expected: "^[A-Z]{3}$",
            });
        }

        let upper = code.to_ascii_uppercase();
        if code != upper {
            return Err(ValidationError::CurrencyNotUppercase {
                got: code.to_string(),
                expected: upper,
            });
        }

        Ok(Self(upper))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self(DEFAULT_CURRENCY.to_string())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_codes() {
        assert_eq!(CurrencyCode::new("RUB").unwrap().as_str(), "RUB");
        assert_eq!(CurrencyCode::new(" EUR ").unwrap().as_str(), "EUR");
        assert_eq!(CurrencyCode::default().as_str(), "RUB");
    }

    #[test]
    fn test_lowercase_rejected() {
        assert_eq!(
            CurrencyCode::new("usd"),
            Err(ValidationError::CurrencyNotUppercase {
                got: "usd".into(),
                expected: "USD".into()
            })
        );
    }

    #[test]
    fn test_bad_format_rejected() {
        for bad in ["", "US", "USDT", "U5D", "€UR"] {
            assert!(
                matches!(
                    CurrencyCode::new(bad),
                    Err(ValidationError::InvalidFormat { .. })
                ),
                "{bad} should be rejected"
            );
        }
    }
}
