//! PostgreSQL Ledger Store
//!
//! Every balance change is a single conditional `UPDATE ... RETURNING`, so
//! the non-negativity check and the write cannot be separated by a
//! concurrent writer. The `CHECK (balance >= 0)` constraint on `accounts`
//! backs this up at the schema level.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row};

use super::error::LedgerError;
use super::models::{Account, NewTransaction, Transaction, TransactionKind};
use super::store::{AccountRepository, LedgerStore, LedgerUnit};
use crate::core_types::{AccountId, UserId};
use crate::money::Money;

const TRANSACTION_COLUMNS: &str =
    "id, seq, from_account, to_account, amount, type, client_ref, created_at";

pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn stored_money(value: Decimal, column: &str) -> Result<Money, LedgerError> {
    Money::from_decimal(value)
        .map_err(|e| LedgerError::Storage(format!("invalid {} in storage: {}", column, e)))
}

fn row_to_account(row: &PgRow) -> Result<Account, LedgerError> {
    let balance: Decimal = row.try_get("balance")?;
    let currency: String = row.try_get("currency")?;
    Ok(Account {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        balance: stored_money(balance, "balance")?,
        currency: currency.trim_end().to_string(),
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_transaction(row: &PgRow) -> Result<Transaction, LedgerError> {
    let kind: String = row.try_get("type")?;
    let kind = TransactionKind::from_db(&kind)
        .ok_or_else(|| LedgerError::Storage(format!("unknown transaction type: {}", kind)))?;
    let amount: Decimal = row.try_get("amount")?;
    Ok(Transaction {
        id: row.try_get("id")?,
        seq: row.try_get("seq")?,
        from_account: row.try_get("from_account")?,
        to_account: row.try_get("to_account")?,
        amount: stored_money(amount, "amount")?,
        kind,
        client_ref: row.try_get("client_ref")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl AccountRepository for PgLedger {
    async fn create_account(&self, user_id: UserId, currency: &str) -> Result<Account, LedgerError> {
        let row = sqlx::query(
            r#"INSERT INTO accounts (id, user_id, balance, currency)
               VALUES ($1, $2, 0, $3)
               RETURNING id, user_id, balance, currency, created_at"#,
        )
        .bind(AccountId::new())
        .bind(user_id)
        .bind(currency)
        .fetch_one(&self.pool)
        .await?;

        row_to_account(&row)
    }

    async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let row = sqlx::query(
            "SELECT id, user_id, balance, currency, created_at FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row_to_account(&row),
            None => Err(LedgerError::NotFound(id)),
        }
    }

    async fn accounts_for_user(&self, user_id: UserId) -> Result<Vec<Account>, LedgerError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, balance, currency, created_at
               FROM accounts WHERE user_id = $1
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_account).collect()
    }
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn get_balance(&self, id: AccountId) -> Result<Money, LedgerError> {
        let balance: Option<Decimal> =
            sqlx::query_scalar("SELECT balance FROM accounts WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match balance {
            Some(b) => stored_money(b, "balance"),
            None => Err(LedgerError::NotFound(id)),
        }
    }

    async fn begin(&self) -> Result<Box<dyn LedgerUnit>, LedgerError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnit { tx }))
    }

    async fn transactions_for(&self, id: AccountId) -> Result<Vec<Transaction>, LedgerError> {
        let sql = format!(
            r#"SELECT {} FROM transactions
               WHERE from_account = $1 OR to_account = $1
               ORDER BY created_at ASC, seq ASC"#,
            TRANSACTION_COLUMNS
        );
        let rows = sqlx::query(&sql).bind(id).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_transaction).collect()
    }

    async fn find_by_reference(
        &self,
        client_ref: &str,
    ) -> Result<Option<Transaction>, LedgerError> {
        let sql = format!(
            "SELECT {} FROM transactions WHERE client_ref = $1",
            TRANSACTION_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(client_ref)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_transaction).transpose()
    }
}

/// Unit of work over one database transaction
///
/// sqlx rolls the transaction back when it is dropped uncommitted.
struct PgUnit {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerUnit for PgUnit {
    async fn adjust_balance(&mut self, id: AccountId, delta: Decimal) -> Result<Money, LedgerError> {
        let updated: Option<Decimal> = sqlx::query_scalar(
            r#"UPDATE accounts SET balance = balance + $1
               WHERE id = $2 AND balance + $1 >= 0 AND balance + $1 <= $3
               RETURNING balance"#,
        )
        .bind(delta)
        .bind(id)
        .bind(Money::max_value().as_decimal())
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(balance) = updated {
            return stored_money(balance, "balance");
        }

        // Zero rows: tell a missing account apart from a refused update
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await?;

        if !exists {
            Err(LedgerError::NotFound(id))
        } else if delta.is_sign_negative() {
            Err(LedgerError::InsufficientFunds(id))
        } else {
            Err(LedgerError::LimitExceeded(id))
        }
    }

    async fn record(&mut self, entry: &NewTransaction) -> Result<Transaction, LedgerError> {
        let result = sqlx::query(
            r#"INSERT INTO transactions (id, from_account, to_account, amount, type, client_ref)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING seq, created_at"#,
        )
        .bind(entry.id)
        .bind(entry.from_account)
        .bind(entry.to_account)
        .bind(entry.amount.as_decimal())
        .bind(entry.kind.as_str())
        .bind(entry.client_ref.as_deref())
        .fetch_one(&mut *self.tx)
        .await;

        match result {
            Ok(row) => Ok(entry
                .clone()
                .into_stored(row.try_get("seq")?, row.try_get("created_at")?)),
            Err(sqlx::Error::Database(db))
                if db.is_unique_violation()
                    && db.constraint().is_some_and(|c| c.contains("client_ref")) =>
            {
                Err(LedgerError::DuplicateReference(
                    entry.client_ref.clone().unwrap_or_default(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        // Once COMMIT is on the wire a failure no longer tells us the outcome
        self.tx
            .commit()
            .await
            .map_err(|e| LedgerError::CommitUnknown(e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<(), LedgerError> {
        self.tx.rollback().await.map_err(LedgerError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::join_all;

    use super::*;
    use crate::db::test_database;
    use crate::transfer::{RetryPolicy, TransferCoordinator, TransferError};

    async fn seeded_user(pool: &PgPool) -> UserId {
        let user_id = UserId::new();
        sqlx::query(
            "INSERT INTO users (id, email, username, password_hash) VALUES ($1, $2, $3, 'x')",
        )
        .bind(user_id)
        .bind(format!("{}@test.local", user_id))
        .bind(format!("u{}", user_id.as_uuid().simple()))
        .execute(pool)
        .await
        .unwrap();
        user_id
    }

    /// Coordinator over a live pool, plus `count` fresh accounts holding `balance`
    async fn coordinator_with_accounts(
        balance: &str,
        count: usize,
    ) -> (Arc<TransferCoordinator>, Arc<PgLedger>, Vec<AccountId>) {
        let db = test_database().await;
        let ledger = Arc::new(PgLedger::new(db.pool().clone()));
        let user = seeded_user(db.pool()).await;
        let opening = Money::parse(balance).unwrap();

        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let account = ledger.create_account(user, "RUB").await.unwrap();
            if !opening.is_zero() {
                ledger.adjust_balance(account.id, opening.credit()).await.unwrap();
            }
            ids.push(account.id);
        }

        let policy = RetryPolicy {
            max_attempts: 5,
            base_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(50),
        };
        let coordinator = Arc::new(TransferCoordinator::with_policy(
            ledger.clone(),
            policy,
            Duration::from_secs(10),
        ));
        (coordinator, ledger, ids)
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL running
    async fn test_conditional_update_refuses_overdraft() {
        let db = test_database().await;
        let ledger = PgLedger::new(db.pool().clone());
        let user = seeded_user(db.pool()).await;
        let account = ledger.create_account(user, "RUB").await.unwrap();

        let deposit = Money::parse("10.00").unwrap();
        assert_eq!(
            ledger.adjust_balance(account.id, deposit.credit()).await.unwrap(),
            deposit
        );

        let err = ledger
            .adjust_balance(account.id, Money::parse("10.01").unwrap().debit())
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::InsufficientFunds(account.id));
        assert_eq!(ledger.get_balance(account.id).await.unwrap(), deposit);
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL running
    async fn test_missing_account_is_not_found() {
        let db = test_database().await;
        let ledger = PgLedger::new(db.pool().clone());
        let ghost = AccountId::new();
        let err = ledger
            .adjust_balance(ghost, Money::parse("1").unwrap().credit())
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::NotFound(ghost));
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL running
    async fn test_dropped_unit_leaves_no_trace() {
        let db = test_database().await;
        let ledger = PgLedger::new(db.pool().clone());
        let user = seeded_user(db.pool()).await;
        let account = ledger.create_account(user, "RUB").await.unwrap();
        let amount = Money::parse("3.00").unwrap();

        {
            let mut unit = ledger.begin().await.unwrap();
            unit.adjust_balance(account.id, amount.credit()).await.unwrap();
            unit.record(&NewTransaction::deposit(account.id, amount))
                .await
                .unwrap();
        }

        assert_eq!(ledger.get_balance(account.id).await.unwrap(), Money::ZERO);
        assert!(ledger.transactions_for(account.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires PostgreSQL running
    async fn test_duplicate_client_ref_is_reported() {
        let db = test_database().await;
        let ledger = PgLedger::new(db.pool().clone());
        let user = seeded_user(db.pool()).await;
        let account = ledger.create_account(user, "RUB").await.unwrap();
        let amount = Money::parse("1.00").unwrap();
        let reference = format!("ref-{}", AccountId::new());

        let mut unit = ledger.begin().await.unwrap();
        unit.adjust_balance(account.id, amount.credit()).await.unwrap();
        let first = unit
            .record(&NewTransaction::deposit(account.id, amount).with_client_ref(Some(reference.clone())))
            .await
            .unwrap();
        unit.commit().await.unwrap();

        let mut unit = ledger.begin().await.unwrap();
        let err = unit
            .record(&NewTransaction::deposit(account.id, amount).with_client_ref(Some(reference.clone())))
            .await
            .unwrap_err();
        assert_eq!(err, LedgerError::DuplicateReference(reference.clone()));
        unit.rollback().await.unwrap();

        let found = ledger.find_by_reference(&reference).await.unwrap().unwrap();
        assert_eq!(found.id, first.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    #[ignore] // Requires PostgreSQL running
    async fn test_hundred_concurrent_unit_transfers_drain_source() {
        let (coordinator, ledger, ids) = coordinator_with_accounts("0", 101).await;
        let source = ids[0];
        ledger
            .adjust_balance(source, Money::parse("100").unwrap().credit())
            .await
            .unwrap();
        let one = Money::parse("1").unwrap();

        let results = join_all(ids[1..].iter().map(|&to| {
            let coordinator = coordinator.clone();
            async move { coordinator.transfer(source, to, one, None).await }
        }))
        .await;

        for result in results {
            result.unwrap();
        }
        assert_eq!(ledger.get_balance(source).await.unwrap(), Money::ZERO);
        assert_eq!(ledger.transactions_for(source).await.unwrap().len(), 100);
        for &to in &ids[1..] {
            assert_eq!(ledger.get_balance(to).await.unwrap(), one);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    #[ignore] // Requires PostgreSQL running
    async fn test_oversubscribed_debits_never_overdraw() {
        let (coordinator, ledger, ids) = coordinator_with_accounts("0", 2).await;
        let (source, sink) = (ids[0], ids[1]);
        ledger
            .adjust_balance(source, Money::parse("10").unwrap().credit())
            .await
            .unwrap();
        let one = Money::parse("1").unwrap();

        let results = join_all((0..25).map(|_| {
            let coordinator = coordinator.clone();
            async move { coordinator.transfer(source, sink, one, None).await }
        }))
        .await;

        let mut ok = 0;
        for result in results {
            match result {
                Ok(_) => ok += 1,
                Err(TransferError::InsufficientFunds(id)) => assert_eq!(id, source),
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 10);
        assert_eq!(ledger.get_balance(source).await.unwrap(), Money::ZERO);
        assert_eq!(
            ledger.get_balance(sink).await.unwrap(),
            Money::parse("10").unwrap()
        );
        assert_eq!(ledger.transactions_for(source).await.unwrap().len(), 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    #[ignore] // Requires PostgreSQL running
    async fn test_opposing_transfers_do_not_deadlock() {
        let (coordinator, ledger, ids) = coordinator_with_accounts("500", 2).await;
        let (a, b) = (ids[0], ids[1]);
        let amount = Money::parse("7.25").unwrap();

        // A lock-order deadlock would surface as 40P01 and exhaust the retries
        let results = join_all((0..60).map(|i| {
            let coordinator = coordinator.clone();
            let (from, to) = if i % 2 == 0 { (a, b) } else { (b, a) };
            async move { coordinator.transfer(from, to, amount, None).await }
        }))
        .await;

        for result in results {
            result.unwrap();
        }
        let five_hundred = Money::parse("500").unwrap();
        assert_eq!(ledger.get_balance(a).await.unwrap(), five_hundred);
        assert_eq!(ledger.get_balance(b).await.unwrap(), five_hundred);
        assert_eq!(ledger.transactions_for(a).await.unwrap().len(), 60);
    }
}
