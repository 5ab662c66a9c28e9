//! Central-bank key rate
//!
//! Only a stub provider exists: the key rate comes from configuration and
//! the bank's lending rate is the key rate plus a fixed margin.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;

use crate::config::CentralBankConfig;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateError {
    #[error("Invalid rate configuration: {0}")]
    InvalidConfig(String),

    #[error("Rate source unavailable: {0}")]
    Unavailable(String),
}

/// Rate quote; percentages as decimal strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct KeyRate {
    #[schema(value_type = String, example = "16.00")]
    pub key_rate: Decimal,
    #[schema(value_type = String, example = "5.00")]
    pub margin: Decimal,
    /// `key_rate + margin`
    #[schema(value_type = String, example = "21.00")]
    pub lending_rate: Decimal,
    pub as_of: DateTime<Utc>,
}

#[async_trait]
pub trait KeyRateProvider: Send + Sync {
    async fn key_rate(&self) -> Result<KeyRate, RateError>;
}

/// Serves the configured key rate
#[derive(Debug, Clone)]
pub struct StubKeyRateProvider {
    key_rate: Decimal,
    margin: Decimal,
}

impl StubKeyRateProvider {
    pub fn new(key_rate: Decimal, margin: Decimal) -> Self {
        Self { key_rate, margin }
    }

    pub fn from_config(config: &CentralBankConfig) -> Result<Self, RateError> {
        let parse = |field: &str, value: &str| {
            Decimal::from_str(value)
                .map_err(|e| RateError::InvalidConfig(format!("{}={}: {}", field, value, e)))
        };
        Ok(Self::new(
            parse("key_rate", &config.key_rate)?,
            parse("margin", &config.margin)?,
        ))
    }
}

#[async_trait]
impl KeyRateProvider for StubKeyRateProvider {
    async fn key_rate(&self) -> Result<KeyRate, RateError> {
        Ok(KeyRate {
            key_rate: self.key_rate,
            margin: self.margin,
            lending_rate: self.key_rate + self.margin,
            as_of: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lending_rate_adds_margin() {
        let provider = StubKeyRateProvider::from_config(&CentralBankConfig::default()).unwrap();
        let rate = provider.key_rate().await.unwrap();
        assert_eq!(rate.key_rate, Decimal::new(1600, 2));
        assert_eq!(rate.lending_rate, Decimal::new(2100, 2));
    }

    #[test]
    fn test_invalid_config() {
        let config = CentralBankConfig {
            key_rate: "sixteen".into(),
            margin: "5".into(),
        };
        assert!(matches!(
            StubKeyRateProvider::from_config(&config),
            Err(RateError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_serializes_rates_as_strings() {
        let provider = StubKeyRateProvider::new(Decimal::new(1650, 2), Decimal::new(500, 2));
        let json = serde_json::to_value(provider.key_rate().await.unwrap()).unwrap();
        assert_eq!(json["lending_rate"], "21.50");
    }
}
