//! Ledger Store error types

use thiserror::Error;

use crate::core_types::AccountId;

/// PostgreSQL SQLSTATE codes treated as transient
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const ADMIN_SHUTDOWN: &str = "57P01";
const CANNOT_CONNECT_NOW: &str = "57P03";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    /// The conditional update refused to take the balance below zero
    #[error("Insufficient funds in account {0}")]
    InsufficientFunds(AccountId),

    /// The conditional update refused to take the balance above the limit
    #[error("Balance limit exceeded for account {0}")]
    LimitExceeded(AccountId),

    #[error("Client reference already used: {0}")]
    DuplicateReference(String),

    /// Transient infrastructure failure, safe to retry the whole unit
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Non-transient storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Commit was issued but its outcome is not known
    #[error("Commit outcome unknown: {0}")]
    CommitUnknown(String),
}

impl LedgerError {
    /// Whether retrying the unit of work from scratch may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Unavailable(_))
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => LedgerError::Unavailable(e.to_string()),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(SERIALIZATION_FAILURE | DEADLOCK_DETECTED | ADMIN_SHUTDOWN | CANNOT_CONNECT_NOW) => {
                    LedgerError::Unavailable(e.to_string())
                }
                Some(code) if code.starts_with("08") => LedgerError::Unavailable(e.to_string()),
                _ => LedgerError::Storage(e.to_string()),
            },
            _ => LedgerError::Storage(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_timeout_is_transient() {
        let err = LedgerError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_transient());
    }

    #[test]
    fn test_row_not_found_is_not_transient() {
        let err = LedgerError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, LedgerError::Storage(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_column_decode_failure_is_storage() {
        let err = LedgerError::from(sqlx::Error::ColumnDecode {
            index: "currency".into(),
            source: "unexpected null".into(),
        });
        assert!(matches!(err, LedgerError::Storage(ref msg) if msg.contains("currency")));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_commit_unknown_is_not_transient() {
        assert!(!LedgerError::CommitUnknown("lost ack".into()).is_transient());
    }
}
