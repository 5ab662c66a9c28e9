//! Ledger Store contract
//!
//! Implementations: [`PgLedger`](super::PgLedger) for production,
//! [`MemoryLedger`](super::MemoryLedger) for tests and the `--store memory`
//! mode.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::models::{Account, NewTransaction, Transaction};
use crate::core_types::{AccountId, UserId};
use crate::money::Money;

/// Account rows owned by users
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Open a zero-balance account
    async fn create_account(&self, user_id: UserId, currency: &str) -> Result<Account, LedgerError>;

    /// Fetch one account, `NotFound` if absent
    async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError>;

    /// All accounts of a user, oldest first
    async fn accounts_for_user(&self, user_id: UserId) -> Result<Vec<Account>, LedgerError>;
}

/// Balances and the transaction log
///
/// Balance mutation only happens inside a [`LedgerUnit`] so that the legs of
/// a movement and its ledger entry commit or vanish together.
#[async_trait]
pub trait LedgerStore: AccountRepository {
    /// Committed balance
    async fn get_balance(&self, id: AccountId) -> Result<Money, LedgerError>;

    /// Start a unit of work
    async fn begin(&self) -> Result<Box<dyn LedgerUnit>, LedgerError>;

    /// Entries touching an account, ordered by creation time then seq
    async fn transactions_for(&self, id: AccountId) -> Result<Vec<Transaction>, LedgerError>;

    /// Entry recorded under a client reference, if any
    async fn find_by_reference(&self, client_ref: &str)
    -> Result<Option<Transaction>, LedgerError>;

    /// Single-leg adjustment committed on its own
    async fn adjust_balance(&self, id: AccountId, delta: Decimal) -> Result<Money, LedgerError> {
        let mut unit = self.begin().await?;
        let balance = unit.adjust_balance(id, delta).await?;
        unit.commit().await?;
        Ok(balance)
    }
}

/// One all-or-nothing group of ledger writes
///
/// Dropping a unit without calling [`commit`](LedgerUnit::commit) discards
/// everything it wrote.
#[async_trait]
pub trait LedgerUnit: Send {
    /// Apply `delta` to the balance iff the result stays within
    /// `[0, Money::max_value()]`; returns the new balance.
    ///
    /// Refusals leave the unit usable: `InsufficientFunds` for a debit below
    /// zero, `LimitExceeded` for a credit above the limit, `NotFound` if the
    /// account does not exist.
    async fn adjust_balance(&mut self, id: AccountId, delta: Decimal) -> Result<Money, LedgerError>;

    /// Append a ledger entry; `DuplicateReference` if its client reference
    /// is already taken.
    async fn record(&mut self, entry: &NewTransaction) -> Result<Transaction, LedgerError>;

    /// Make every write visible atomically.
    ///
    /// `CommitUnknown` means the writes may or may not have been applied.
    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;

    /// Discard every write
    async fn rollback(self: Box<Self>) -> Result<(), LedgerError>;
}
