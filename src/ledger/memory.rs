//! In-memory Ledger Store
//!
//! Backs the `--store memory` mode and every test that does not need
//! PostgreSQL. A unit of work holds the state lock from `begin` until it is
//! committed, rolled back or dropped, so units are fully serialized. Writes
//! go straight into the shared state and are reverted from an undo log.
//!
//! [`FaultPlan`] injects storage failures at chosen points so the
//! coordinator's rollback, retry and timeout paths can be driven
//! deterministically.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::error::LedgerError;
use super::models::{Account, NewTransaction, Transaction};
use super::store::{AccountRepository, LedgerStore, LedgerUnit};
use crate::core_types::{AccountId, UserId};
use crate::money::{Money, MoneyError};

// ============================================================================
// Fault injection
// ============================================================================

/// Kind of injected storage failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Surfaces as `LedgerError::Unavailable` (retryable)
    Transient,
    /// Surfaces as `LedgerError::Storage`
    Permanent,
}

impl Fault {
    fn into_error(self, at: &str) -> LedgerError {
        match self {
            Fault::Transient => LedgerError::Unavailable(format!("injected transient fault at {}", at)),
            Fault::Permanent => LedgerError::Storage(format!("injected fault at {}", at)),
        }
    }
}

#[derive(Debug, Default)]
struct FaultState {
    begin: Option<(Fault, u32)>,
    adjust: HashMap<AccountId, (Fault, u32)>,
    record: Option<(Fault, u32)>,
    /// `(applied, remaining)`
    commit: Option<(bool, u32)>,
    rollback: u32,
    latency: Option<Duration>,
    units_started: u64,
}

fn take(slot: &mut Option<(Fault, u32)>) -> Option<Fault> {
    let (fault, remaining) = slot.as_mut()?;
    let fault = *fault;
    *remaining -= 1;
    if *remaining == 0 {
        *slot = None;
    }
    Some(fault)
}

/// Scripted failures for a [`MemoryLedger`]
///
/// Each `fail_*` call arms a fault for the next `times` occurrences of that
/// step; afterwards the step behaves normally again.
#[derive(Debug, Default)]
pub struct FaultPlan {
    state: StdMutex<FaultState>,
}

impl FaultPlan {
    fn lock(&self) -> MutexGuard<'_, FaultState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn fail_begin(&self, fault: Fault, times: u32) {
        if times > 0 {
            self.lock().begin = Some((fault, times));
        }
    }

    /// Fail balance adjustments on one account
    pub fn fail_adjust(&self, id: AccountId, fault: Fault, times: u32) {
        if times > 0 {
            self.lock().adjust.insert(id, (fault, times));
        }
    }

    pub fn fail_record(&self, fault: Fault, times: u32) {
        if times > 0 {
            self.lock().record = Some((fault, times));
        }
    }

    /// Make commit report an unknown outcome
    ///
    /// With `applied` the writes stay in place (lost acknowledgement),
    /// otherwise they are discarded.
    pub fn fail_commit(&self, applied: bool, times: u32) {
        if times > 0 {
            self.lock().commit = Some((applied, times));
        }
    }

    /// Make rollback report failure (the writes are still discarded)
    pub fn fail_rollback(&self, times: u32) {
        self.lock().rollback = times;
    }

    /// Delay added before every balance adjustment
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// Number of units of work started so far
    pub fn units_started(&self) -> u64 {
        self.lock().units_started
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        let started = state.units_started;
        *state = FaultState {
            units_started: started,
            ..FaultState::default()
        };
    }

    fn on_begin(&self) -> Option<Fault> {
        let mut state = self.lock();
        state.units_started += 1;
        take(&mut state.begin)
    }

    fn on_adjust(&self, id: AccountId) -> (Option<Duration>, Option<Fault>) {
        let mut state = self.lock();
        let latency = state.latency;
        let mut slot = state.adjust.remove(&id);
        let fault = take(&mut slot);
        if let Some(rest) = slot {
            state.adjust.insert(id, rest);
        }
        (latency, fault)
    }

    fn on_record(&self) -> Option<Fault> {
        take(&mut self.lock().record)
    }

    fn on_commit(&self) -> Option<bool> {
        let mut state = self.lock();
        let (applied, remaining) = state.commit.as_mut()?;
        let applied = *applied;
        *remaining -= 1;
        if *remaining == 0 {
            state.commit = None;
        }
        Some(applied)
    }

    fn on_rollback(&self) -> bool {
        let mut state = self.lock();
        if state.rollback > 0 {
            state.rollback -= 1;
            true
        } else {
            false
        }
    }
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<AccountId, Account>,
    transactions: Vec<Transaction>,
    by_reference: HashMap<String, usize>,
    next_seq: i64,
}

#[derive(Clone, Default)]
pub struct MemoryLedger {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<FaultPlan>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &FaultPlan {
        &self.faults
    }

    /// Open an account with a starting balance, bypassing the ledger
    pub async fn seed_account(&self, user_id: UserId, balance: Money) -> Account {
        let account = Account {
            id: AccountId::new(),
            user_id,
            balance,
            currency: super::models::DEFAULT_CURRENCY.to_string(),
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .await
            .accounts
            .insert(account.id, account.clone());
        account
    }

    /// Sum of all balances
    pub async fn total_balance(&self) -> Decimal {
        self.state
            .lock()
            .await
            .accounts
            .values()
            .map(|a| a.balance.as_decimal())
            .sum()
    }
}

#[async_trait]
impl AccountRepository for MemoryLedger {
    async fn create_account(&self, user_id: UserId, currency: &str) -> Result<Account, LedgerError> {
        let account = Account {
            id: AccountId::new(),
            user_id,
            balance: Money::ZERO,
            currency: currency.to_string(),
            created_at: Utc::now(),
        };
        self.state
            .lock()
            .await
            .accounts
            .insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.state
            .lock()
            .await
            .accounts
            .get(&id)
            .cloned()
            .ok_or(LedgerError::NotFound(id))
    }

    async fn accounts_for_user(&self, user_id: UserId) -> Result<Vec<Account>, LedgerError> {
        let state = self.state.lock().await;
        let mut accounts: Vec<Account> = state
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        accounts.sort_by_key(|a| (a.created_at, a.id));
        Ok(accounts)
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn get_balance(&self, id: AccountId) -> Result<Money, LedgerError> {
        self.state
            .lock()
            .await
            .accounts
            .get(&id)
            .map(|a| a.balance)
            .ok_or(LedgerError::NotFound(id))
    }

    async fn begin(&self) -> Result<Box<dyn LedgerUnit>, LedgerError> {
        if let Some(fault) = self.faults.on_begin() {
            return Err(fault.into_error("begin"));
        }
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryUnit {
            state: guard,
            undo: Vec::new(),
            faults: self.faults.clone(),
            finished: false,
        }))
    }

    async fn transactions_for(&self, id: AccountId) -> Result<Vec<Transaction>, LedgerError> {
        let state = self.state.lock().await;
        let mut entries: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| t.from_account == Some(id) || t.to_account == Some(id))
            .cloned()
            .collect();
        entries.sort_by_key(|t| (t.created_at, t.seq));
        Ok(entries)
    }

    async fn find_by_reference(
        &self,
        client_ref: &str,
    ) -> Result<Option<Transaction>, LedgerError> {
        let state = self.state.lock().await;
        Ok(state
            .by_reference
            .get(client_ref)
            .and_then(|&idx| state.transactions.get(idx))
            .cloned())
    }
}

// ============================================================================
// Unit of work
// ============================================================================

enum Undo {
    Balance { id: AccountId, previous: Money },
    Entry { client_ref: Option<String> },
}

struct MemoryUnit {
    state: OwnedMutexGuard<MemoryState>,
    undo: Vec<Undo>,
    faults: Arc<FaultPlan>,
    finished: bool,
}

impl MemoryUnit {
    fn revert(&mut self) {
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::Balance { id, previous } => {
                    if let Some(account) = self.state.accounts.get_mut(&id) {
                        account.balance = previous;
                    }
                }
                Undo::Entry { client_ref } => {
                    self.state.transactions.pop();
                    if let Some(r) = client_ref {
                        self.state.by_reference.remove(&r);
                    }
                }
            }
        }
    }
}

impl Drop for MemoryUnit {
    fn drop(&mut self) {
        if !self.finished {
            self.revert();
        }
    }
}

#[async_trait]
impl LedgerUnit for MemoryUnit {
    async fn adjust_balance(&mut self, id: AccountId, delta: Decimal) -> Result<Money, LedgerError> {
        let (latency, fault) = self.faults.on_adjust(id);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(fault) = fault {
            return Err(fault.into_error("adjust_balance"));
        }

        let account = self
            .state
            .accounts
            .get_mut(&id)
            .ok_or(LedgerError::NotFound(id))?;
        let previous = account.balance;
        let next = previous
            .as_decimal()
            .checked_add(delta)
            .ok_or(LedgerError::LimitExceeded(id))?;
        if next.is_sign_negative() && !next.is_zero() {
            return Err(LedgerError::InsufficientFunds(id));
        }
        let next = Money::from_decimal(next).map_err(|e| match e {
            MoneyError::Overflow => LedgerError::LimitExceeded(id),
            other => LedgerError::Storage(other.to_string()),
        })?;

        account.balance = next;
        self.undo.push(Undo::Balance { id, previous });
        Ok(next)
    }

    async fn record(&mut self, entry: &NewTransaction) -> Result<Transaction, LedgerError> {
        if let Some(fault) = self.faults.on_record() {
            return Err(fault.into_error("record"));
        }
        if let Some(r) = &entry.client_ref {
            if self.state.by_reference.contains_key(r) {
                return Err(LedgerError::DuplicateReference(r.clone()));
            }
        }

        self.state.next_seq += 1;
        let stored = entry.clone().into_stored(self.state.next_seq, Utc::now());
        let idx = self.state.transactions.len();
        self.state.transactions.push(stored.clone());
        if let Some(r) = &entry.client_ref {
            self.state.by_reference.insert(r.clone(), idx);
        }
        self.undo.push(Undo::Entry {
            client_ref: entry.client_ref.clone(),
        });
        Ok(stored)
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let mut unit = self;
        match unit.faults.on_commit() {
            None => {
                unit.undo.clear();
                unit.finished = true;
                Ok(())
            }
            Some(applied) => {
                if applied {
                    unit.undo.clear();
                } else {
                    unit.revert();
                }
                unit.finished = true;
                Err(LedgerError::CommitUnknown(
                    "injected: commit acknowledgement lost".into(),
                ))
            }
        }
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        let mut unit = self;
        unit.revert();
        unit.finished = true;
        if unit.faults.on_rollback() {
            return Err(LedgerError::Storage("injected rollback failure".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(s: &str) -> Money {
        Money::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_adjust_refuses_overdraft_and_keeps_unit_usable() {
        let ledger = MemoryLedger::new();
        let a = ledger.seed_account(UserId::new(), money("5.00")).await;

        let mut unit = ledger.begin().await.unwrap();
        assert_eq!(
            unit.adjust_balance(a.id, money("5.01").debit()).await,
            Err(LedgerError::InsufficientFunds(a.id))
        );
        assert_eq!(
            unit.adjust_balance(a.id, money("5.00").debit()).await,
            Ok(Money::ZERO)
        );
        unit.commit().await.unwrap();
        assert_eq!(ledger.get_balance(a.id).await.unwrap(), Money::ZERO);
    }

    #[tokio::test]
    async fn test_adjust_refuses_limit_breach() {
        let ledger = MemoryLedger::new();
        let a = ledger.seed_account(UserId::new(), Money::max_value()).await;
        assert_eq!(
            ledger.adjust_balance(a.id, money("0.01").credit()).await,
            Err(LedgerError::LimitExceeded(a.id))
        );
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let ledger = MemoryLedger::new();
        let ghost = AccountId::new();
        assert_eq!(
            ledger.get_balance(ghost).await,
            Err(LedgerError::NotFound(ghost))
        );
        assert_eq!(
            ledger.adjust_balance(ghost, money("1").credit()).await,
            Err(LedgerError::NotFound(ghost))
        );
    }

    #[tokio::test]
    async fn test_drop_reverts_everything() {
        let ledger = MemoryLedger::new();
        let a = ledger.seed_account(UserId::new(), money("10.00")).await;
        let b = ledger.seed_account(UserId::new(), Money::ZERO).await;
        let amount = money("4.00");

        {
            let mut unit = ledger.begin().await.unwrap();
            unit.adjust_balance(a.id, amount.debit()).await.unwrap();
            unit.adjust_balance(b.id, amount.credit()).await.unwrap();
            unit.record(
                &NewTransaction::transfer(a.id, b.id, amount).with_client_ref(Some("r1".into())),
            )
            .await
            .unwrap();
        }

        assert_eq!(ledger.get_balance(a.id).await.unwrap(), money("10.00"));
        assert_eq!(ledger.get_balance(b.id).await.unwrap(), Money::ZERO);
        assert!(ledger.transactions_for(a.id).await.unwrap().is_empty());
        assert!(ledger.find_by_reference("r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_publishes_entry_in_order() {
        let ledger = MemoryLedger::new();
        let a = ledger.seed_account(UserId::new(), Money::ZERO).await;

        for amount in ["1.00", "2.00"] {
            let mut unit = ledger.begin().await.unwrap();
            unit.adjust_balance(a.id, money(amount).credit()).await.unwrap();
            unit.record(&NewTransaction::deposit(a.id, money(amount)))
                .await
                .unwrap();
            unit.commit().await.unwrap();
        }

        let history = ledger.transactions_for(a.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].seq < history[1].seq);
        assert_eq!(history[0].amount, money("1.00"));
    }

    #[tokio::test]
    async fn test_duplicate_reference() {
        let ledger = MemoryLedger::new();
        let a = ledger.seed_account(UserId::new(), Money::ZERO).await;
        let entry = NewTransaction::deposit(a.id, money("1")).with_client_ref(Some("dup".into()));

        let mut unit = ledger.begin().await.unwrap();
        unit.record(&entry).await.unwrap();
        unit.commit().await.unwrap();

        let mut unit = ledger.begin().await.unwrap();
        assert_eq!(
            unit.record(&NewTransaction::deposit(a.id, money("1")).with_client_ref(Some("dup".into())))
                .await,
            Err(LedgerError::DuplicateReference("dup".into()))
        );
    }

    #[tokio::test]
    async fn test_injected_faults_are_consumed() {
        let ledger = MemoryLedger::new();
        let a = ledger.seed_account(UserId::new(), Money::ZERO).await;
        ledger.faults().fail_adjust(a.id, Fault::Transient, 1);

        let err = ledger.adjust_balance(a.id, money("1").credit()).await.unwrap_err();
        assert!(err.is_transient());
        assert!(ledger.adjust_balance(a.id, money("1").credit()).await.is_ok());
        assert_eq!(ledger.faults().units_started(), 2);
    }

    #[tokio::test]
    async fn test_ambiguous_commit_variants() {
        let ledger = MemoryLedger::new();
        let a = ledger.seed_account(UserId::new(), Money::ZERO).await;

        ledger.faults().fail_commit(true, 1);
        let err = ledger.adjust_balance(a.id, money("1").credit()).await.unwrap_err();
        assert!(matches!(err, LedgerError::CommitUnknown(_)));
        assert_eq!(ledger.get_balance(a.id).await.unwrap(), money("1"));

        ledger.faults().fail_commit(false, 1);
        let err = ledger.adjust_balance(a.id, money("1").credit()).await.unwrap_err();
        assert!(matches!(err, LedgerError::CommitUnknown(_)));
        assert_eq!(ledger.get_balance(a.id).await.unwrap(), money("1"));
    }

    #[tokio::test]
    async fn test_failed_rollback_still_discards() {
        let ledger = MemoryLedger::new();
        let a = ledger.seed_account(UserId::new(), Money::ZERO).await;
        ledger.faults().fail_rollback(1);

        let mut unit = ledger.begin().await.unwrap();
        unit.adjust_balance(a.id, money("1").credit()).await.unwrap();
        assert!(unit.rollback().await.is_err());
        assert_eq!(ledger.get_balance(a.id).await.unwrap(), Money::ZERO);
    }
}
