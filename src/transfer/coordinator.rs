//! Transfer Coordinator
//!
//! Moves money through a single Ledger Store unit of work: every balance leg
//! and the ledger entry describing them commit together or not at all.
//!
//! ## Failure policy
//! - Refusals from the store (`NotFound`, `InsufficientFunds`) roll the unit
//!   back and surface unchanged.
//! - Transient failures and unit-of-work timeouts roll back and retry the
//!   whole unit with exponential backoff, up to `max_attempts`.
//! - Permanent storage faults roll back and surface as `Internal`.
//! - A failed rollback is logged and discarded; the failing step's error
//!   still decides the outcome.
//! - An unknown commit outcome is escalated as `InconsistentState` on the
//!   `ALERT` log target and never retried.

use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::error::TransferError;
use super::retry::RetryPolicy;
use crate::config::TransferConfig;
use crate::core_types::AccountId;
use crate::ledger::{LedgerError, LedgerStore, LedgerUnit, NewTransaction, Transaction};
use crate::money::Money;

/// Longest accepted client idempotency key
pub const MAX_CLIENT_REF_LEN: usize = 64;

/// Balance movement applied by one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Transfer { from: AccountId, to: AccountId },
    Deposit { to: AccountId },
    Withdrawal { from: AccountId },
}

impl Movement {
    /// Balance legs in ascending account-id order
    ///
    /// Opposing concurrent transfers lock their rows in the same order.
    fn legs(&self, amount: Money) -> Vec<Leg> {
        let mut legs = match *self {
            Movement::Transfer { from, to } => vec![
                Leg::debit(from, amount),
                Leg::credit(to, amount),
            ],
            Movement::Deposit { to } => vec![Leg::credit(to, amount)],
            Movement::Withdrawal { from } => vec![Leg::debit(from, amount)],
        };
        legs.sort_by_key(|leg| leg.account);
        legs
    }

    fn entry(&self, amount: Money) -> NewTransaction {
        match *self {
            Movement::Transfer { from, to } => NewTransaction::transfer(from, to, amount),
            Movement::Deposit { to } => NewTransaction::deposit(to, amount),
            Movement::Withdrawal { from } => NewTransaction::withdrawal(from, amount),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Leg {
    account: AccountId,
    delta: Decimal,
    step: Step,
}

impl Leg {
    fn debit(account: AccountId, amount: Money) -> Self {
        Self {
            account,
            delta: amount.debit(),
            step: Step::Debit,
        }
    }

    fn credit(account: AccountId, amount: Money) -> Self {
        Self {
            account,
            delta: amount.credit(),
            step: Step::Credit,
        }
    }
}

/// Unit-of-work step, reported in logs and escalations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Begin,
    Debit,
    Credit,
    Record,
    Commit,
    Rollback,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Step::Begin => "begin",
            Step::Debit => "debit",
            Step::Credit => "credit",
            Step::Record => "record",
            Step::Commit => "commit",
            Step::Rollback => "rollback",
        };
        f.write_str(s)
    }
}

/// Outcome of a single attempt that did not commit
enum AttemptError {
    /// Rolled back; the whole unit may be tried again
    Retry(String),
    /// Rolled back because the client reference is taken
    DuplicateReference,
    Fail(TransferError),
}

fn id_or_dash(id: Option<AccountId>) -> String {
    id.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string())
}

pub struct TransferCoordinator {
    ledger: Arc<dyn LedgerStore>,
    retry: RetryPolicy,
    op_timeout: Duration,
}

impl TransferCoordinator {
    pub fn new(ledger: Arc<dyn LedgerStore>, config: &TransferConfig) -> Self {
        Self::with_policy(ledger, RetryPolicy::from(config), config.op_timeout())
    }

    pub fn with_policy(
        ledger: Arc<dyn LedgerStore>,
        retry: RetryPolicy,
        op_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            retry,
            op_timeout,
        }
    }

    /// Move `amount` from one account to another
    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Money,
        client_ref: Option<String>,
    ) -> Result<Transaction, TransferError> {
        self.execute(Movement::Transfer { from, to }, amount, client_ref, self.op_timeout)
            .await
    }

    pub async fn deposit(
        &self,
        to: AccountId,
        amount: Money,
        client_ref: Option<String>,
    ) -> Result<Transaction, TransferError> {
        self.execute(Movement::Deposit { to }, amount, client_ref, self.op_timeout)
            .await
    }

    pub async fn withdraw(
        &self,
        from: AccountId,
        amount: Money,
        client_ref: Option<String>,
    ) -> Result<Transaction, TransferError> {
        self.execute(Movement::Withdrawal { from }, amount, client_ref, self.op_timeout)
            .await
    }

    /// Apply a movement with an explicit per-attempt deadline
    ///
    /// The deadline bounds everything up to commit. Commit itself is never
    /// cancelled once issued.
    pub async fn execute(
        &self,
        movement: Movement,
        amount: Money,
        client_ref: Option<String>,
        deadline: Duration,
    ) -> Result<Transaction, TransferError> {
        // === Pre-checks ===
        if amount.is_zero() {
            return Err(TransferError::InvalidArgument(
                "amount must be greater than zero".into(),
            ));
        }
        if let Movement::Transfer { from, to } = movement
            && from == to
        {
            return Err(TransferError::InvalidArgument(
                "source and destination accounts must differ".into(),
            ));
        }
        let client_ref = normalize_client_ref(client_ref)?;
        let entry = movement.entry(amount).with_client_ref(client_ref);

        if let Some(existing) = self.replayed(&entry).await? {
            return Ok(existing);
        }

        // === Unit of work with bounded retries ===
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.attempt(movement, amount, &entry, deadline).await {
                Ok(tx) => {
                    info!(
                        tx_id = %tx.id,
                        kind = %tx.kind,
                        from = %id_or_dash(tx.from_account),
                        to = %id_or_dash(tx.to_account),
                        amount = %amount,
                        attempt,
                        "Movement committed"
                    );
                    return Ok(tx);
                }
                Err(AttemptError::Retry(reason)) if attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        kind = %entry.kind,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "Transient storage failure, retrying unit of work"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(AttemptError::Retry(reason)) => {
                    warn!(
                        kind = %entry.kind,
                        attempts = attempt,
                        reason = %reason,
                        "Giving up after transient storage failures"
                    );
                    return Err(TransferError::StorageUnavailable(reason));
                }
                Err(AttemptError::DuplicateReference) => {
                    // Lost the race to a concurrent request with the same key
                    return match self.replayed(&entry).await? {
                        Some(existing) => Ok(existing),
                        None => Err(TransferError::StorageUnavailable(
                            "client_ref conflict could not be resolved".into(),
                        )),
                    };
                }
                Err(AttemptError::Fail(e)) => return Err(e),
            }
        }
    }

    /// Committed balance of one account
    pub async fn get_balance(&self, id: AccountId) -> Result<Money, TransferError> {
        Ok(self.ledger.get_balance(id).await?)
    }

    /// Ledger entries touching an account, oldest first
    pub async fn get_transactions(&self, id: AccountId) -> Result<Vec<Transaction>, TransferError> {
        // Unknown accounts are NotFound rather than an empty history
        self.ledger.get_account(id).await?;
        Ok(self.ledger.transactions_for(id).await?)
    }

    /// Existing entry for the request's client reference, if this is a replay
    async fn replayed(&self, entry: &NewTransaction) -> Result<Option<Transaction>, TransferError> {
        let Some(client_ref) = entry.client_ref.as_deref() else {
            return Ok(None);
        };
        match self.ledger.find_by_reference(client_ref).await? {
            Some(existing) if entry.same_movement(&existing) => {
                debug!(client_ref, tx_id = %existing.id, "Replayed request, returning existing entry");
                Ok(Some(existing))
            }
            Some(_) => Err(TransferError::InvalidArgument(format!(
                "client_ref {} was already used for a different movement",
                client_ref
            ))),
            None => Ok(None),
        }
    }

    async fn attempt(
        &self,
        movement: Movement,
        amount: Money,
        entry: &NewTransaction,
        deadline: Duration,
    ) -> Result<Transaction, AttemptError> {
        let work = async {
            let mut unit = self
                .ledger
                .begin()
                .await
                .map_err(|e| self.classify(entry, Step::Begin, e))?;

            for leg in movement.legs(amount) {
                if let Err(e) = unit.adjust_balance(leg.account, leg.delta).await {
                    return Err(self.abort(unit, entry, leg.step, e).await);
                }
            }

            match unit.record(entry).await {
                Ok(tx) => Ok((unit, tx)),
                Err(e) => Err(self.abort(unit, entry, Step::Record, e).await),
            }
        };

        // Dropping the unit on timeout rolls it back
        let (unit, tx) = match tokio::time::timeout(deadline, work).await {
            Ok(Ok(done)) => done,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(AttemptError::Retry(format!(
                    "unit of work exceeded {}ms",
                    deadline.as_millis()
                )));
            }
        };

        unit.commit()
            .await
            .map_err(|e| AttemptError::Fail(self.escalate(entry, Step::Commit, &e)))?;
        Ok(tx)
    }

    /// Roll back after a failed step and report the step's error
    ///
    /// An uncommitted unit never becomes visible, so a failed rollback only
    /// costs the connection; the step's own error still decides the outcome.
    async fn abort(
        &self,
        unit: Box<dyn LedgerUnit>,
        entry: &NewTransaction,
        step: Step,
        cause: LedgerError,
    ) -> AttemptError {
        if let Err(e) = unit.rollback().await {
            warn!(
                tx_id = %entry.id,
                kind = %entry.kind,
                failed_step = %step,
                step = %Step::Rollback,
                error = %e,
                "Explicit rollback failed, unit discarded"
            );
        }
        self.classify(entry, step, cause)
    }

    fn classify(&self, entry: &NewTransaction, step: Step, e: LedgerError) -> AttemptError {
        match e {
            LedgerError::DuplicateReference(_) => AttemptError::DuplicateReference,
            e if e.is_transient() => AttemptError::Retry(format!("{}: {}", step, e)),
            e => {
                debug!(kind = %entry.kind, step = %step, error = %e, "Unit of work rolled back");
                AttemptError::Fail(e.into())
            }
        }
    }

    /// Log a money-safety violation and turn it into `InconsistentState`
    fn escalate(&self, entry: &NewTransaction, step: Step, cause: &LedgerError) -> TransferError {
        error!(
            target: "ALERT",
            tx_id = %entry.id,
            kind = %entry.kind,
            from = %id_or_dash(entry.from_account),
            to = %id_or_dash(entry.to_account),
            amount = %entry.amount,
            client_ref = entry.client_ref.as_deref().unwrap_or("-"),
            step = %step,
            error = %cause,
            "Ledger outcome unknown, manual reconciliation required"
        );
        TransferError::InconsistentState(format!(
            "{} failed for transaction {}: {}",
            step, entry.id, cause
        ))
    }
}

fn normalize_client_ref(client_ref: Option<String>) -> Result<Option<String>, TransferError> {
    let Some(raw) = client_ref else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TransferError::InvalidArgument(
            "client_ref must not be blank".into(),
        ));
    }
    if trimmed.len() > MAX_CLIENT_REF_LEN {
        return Err(TransferError::InvalidArgument(format!(
            "client_ref longer than {} bytes",
            MAX_CLIENT_REF_LEN
        )));
    }
    Ok(Some(trimmed.to_string()))
}
