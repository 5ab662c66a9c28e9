//! Transfer Error Types

use thiserror::Error;

use crate::core_types::AccountId;
use crate::ledger::LedgerError;

/// Errors surfaced by the transfer coordinator
///
/// Only `StorageUnavailable` is worth retrying. `InconsistentState` is a
/// money-safety escalation: it is logged under the `ALERT` target before it
/// is returned and is never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Account not found: {0}")]
    NotFound(AccountId),

    #[error("Insufficient funds in account {0}")]
    InsufficientFunds(AccountId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Permanent storage fault (decode error, violated constraint)
    #[error("Internal storage error: {0}")]
    Internal(String),

    #[error("Inconsistent state: {0}")]
    InconsistentState(String),
}

impl TransferError {
    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::NotFound(_) => 404,
            TransferError::InsufficientFunds(_) | TransferError::InvalidArgument(_) => 400,
            TransferError::StorageUnavailable(_) => 503,
            TransferError::Internal(_) | TransferError::InconsistentState(_) => 500,
        }
    }
}

impl From<LedgerError> for TransferError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound(id) => TransferError::NotFound(id),
            LedgerError::InsufficientFunds(id) => TransferError::InsufficientFunds(id),
            LedgerError::LimitExceeded(id) => {
                TransferError::InvalidArgument(format!("balance limit exceeded for account {}", id))
            }
            LedgerError::DuplicateReference(r) => {
                TransferError::InvalidArgument(format!("client_ref already used: {}", r))
            }
            LedgerError::Unavailable(msg) => TransferError::StorageUnavailable(msg),
            LedgerError::Storage(msg) => TransferError::Internal(msg),
            LedgerError::CommitUnknown(msg) => TransferError::InconsistentState(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status() {
        assert_eq!(TransferError::NotFound(AccountId::new()).http_status(), 404);
        assert_eq!(
            TransferError::InsufficientFunds(AccountId::new()).http_status(),
            400
        );
        assert_eq!(TransferError::InvalidArgument("x".into()).http_status(), 400);
        assert_eq!(
            TransferError::StorageUnavailable("x".into()).http_status(),
            503
        );
        assert_eq!(TransferError::Internal("x".into()).http_status(), 500);
        assert_eq!(
            TransferError::InconsistentState("x".into()).http_status(),
            500
        );
    }

    #[test]
    fn test_from_ledger_error() {
        let id = AccountId::new();
        assert_eq!(
            TransferError::from(LedgerError::InsufficientFunds(id)),
            TransferError::InsufficientFunds(id)
        );
        assert!(matches!(
            TransferError::from(LedgerError::Unavailable("pool".into())),
            TransferError::StorageUnavailable(_)
        ));
        assert!(matches!(
            TransferError::from(LedgerError::CommitUnknown("ack".into())),
            TransferError::InconsistentState(_)
        ));
    }

    #[test]
    fn test_permanent_storage_fault_is_not_retryable() {
        let err = TransferError::from(LedgerError::Storage("bad column".into()));
        assert_eq!(err, TransferError::Internal("bad column".into()));
        assert_eq!(err.http_status(), 500);
    }
}
