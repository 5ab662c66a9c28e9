//! Account opening and ownership-scoped lookup

use std::sync::Arc;

use super::error::AccountError;
use super::validation::CurrencyCode;
use crate::core_types::{AccountId, UserId};
use crate::ledger::{Account, LedgerStore};

pub struct AccountService {
    ledger: Arc<dyn LedgerStore>,
}

impl AccountService {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    /// Open a zero-balance account for `user_id`
    pub async fn open(
        &self,
        user_id: UserId,
        currency: Option<&str>,
    ) -> Result<Account, AccountError> {
        let currency = match currency {
            Some(code) => CurrencyCode::new(code)?,
            None => CurrencyCode::default(),
        };
        let account = self
            .ledger
            .create_account(user_id, currency.as_str())
            .await?;
        tracing::info!(account_id = %account.id, user_id = %user_id, currency = %currency, "Account opened");
        Ok(account)
    }

    /// Fetch an account, refusing accounts owned by someone else
    pub async fn get_owned(&self, user_id: UserId, id: AccountId) -> Result<Account, AccountError> {
        let account = self.ledger.get_account(id).await?;
        if account.user_id != user_id {
            tracing::warn!(account_id = %id, user_id = %user_id, "Access to foreign account refused");
            return Err(AccountError::Forbidden);
        }
        Ok(account)
    }

    pub async fn list(&self, user_id: UserId) -> Result<Vec<Account>, AccountError> {
        Ok(self.ledger.accounts_for_user(user_id).await?)
    }
}
