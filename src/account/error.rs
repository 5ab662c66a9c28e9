use thiserror::Error;

use super::validation::ValidationError;
use crate::core_types::AccountId;
use crate::ledger::LedgerError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    #[error("Account does not belong to the caller")]
    Forbidden,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage unavailable: {0}")]
    Storage(String),
}

impl AccountError {
    pub fn http_status(&self) -> u16 {
        match self {
            AccountError::NotFound(_) => 404,
            AccountError::Forbidden => 403,
            AccountError::InvalidInput(_) => 400,
            AccountError::Storage(_) => 503,
        }
    }
}

impl From<LedgerError> for AccountError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound(id) => AccountError::NotFound(id),
            other => AccountError::Storage(other.to_string()),
        }
    }
}

impl From<ValidationError> for AccountError {
    fn from(e: ValidationError) -> Self {
        AccountError::InvalidInput(e.to_string())
    }
}
