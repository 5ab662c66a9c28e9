//! Ledger data model: accounts and immutable ledger entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use crate::core_types::{AccountId, TransactionId, UserId};
use crate::money::Money;

/// Currency assigned to accounts opened without an explicit code
pub const DEFAULT_CURRENCY: &str = "RUB";

/// Bank account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Account {
    pub id: AccountId,
    pub user_id: UserId,
    #[schema(value_type = String, example = "100.50")]
    pub balance: Money,
    #[schema(example = "RUB")]
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Transfer,
    Deposit,
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Transfer => "transfer",
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "transfer" => Some(TransactionKind::Transfer),
            "deposit" => Some(TransactionKind::Deposit),
            "withdrawal" => Some(TransactionKind::Withdrawal),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable ledger entry
///
/// Written in the same unit of work as the balance adjustments it describes.
/// Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Transaction {
    pub id: TransactionId,
    /// Tie-breaker for entries sharing a creation timestamp
    pub seq: i64,
    pub from_account: Option<AccountId>,
    pub to_account: Option<AccountId>,
    #[schema(value_type = String, example = "100.50")]
    pub amount: Money,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry about to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub id: TransactionId,
    pub from_account: Option<AccountId>,
    pub to_account: Option<AccountId>,
    pub amount: Money,
    pub kind: TransactionKind,
    pub client_ref: Option<String>,
}

impl NewTransaction {
    pub fn transfer(from: AccountId, to: AccountId, amount: Money) -> Self {
        Self::build(Some(from), Some(to), amount, TransactionKind::Transfer)
    }

    pub fn deposit(to: AccountId, amount: Money) -> Self {
        Self::build(None, Some(to), amount, TransactionKind::Deposit)
    }

    pub fn withdrawal(from: AccountId, amount: Money) -> Self {
        Self::build(Some(from), None, amount, TransactionKind::Withdrawal)
    }

    fn build(
        from_account: Option<AccountId>,
        to_account: Option<AccountId>,
        amount: Money,
        kind: TransactionKind,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            from_account,
            to_account,
            amount,
            kind,
            client_ref: None,
        }
    }

    pub fn with_client_ref(mut self, client_ref: Option<String>) -> Self {
        self.client_ref = client_ref;
        self
    }

    /// Whether an already stored entry describes the same movement
    ///
    /// Used to decide if a repeated client reference is a replay or a reuse.
    pub fn same_movement(&self, existing: &Transaction) -> bool {
        self.kind == existing.kind
            && self.from_account == existing.from_account
            && self.to_account == existing.to_account
            && self.amount == existing.amount
    }

    /// Materialise the stored form once the store assigned seq/timestamp
    pub fn into_stored(self, seq: i64, created_at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: self.id,
            seq,
            from_account: self.from_account,
            to_account: self.to_account,
            amount: self.amount,
            kind: self.kind,
            client_ref: self.client_ref,
            created_at,
        }
    }
}
