use std::sync::Arc;

use crate::account::AccountService;
use crate::card::{CardService, CardStore, MemoryCardStore};
use crate::central_bank::{KeyRateProvider, RateError, StubKeyRateProvider};
use crate::config::AppConfig;
use crate::db::Database;
use crate::ledger::{LedgerStore, MemoryLedger};
use crate::transfer::TransferCoordinator;
use crate::user_auth::{MemoryUserStore, UserAuthService, UserStore};

/// Gateway application state, shared by every handler
///
/// Built once in `main` from the selected stores; nothing here is a global.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub transfers: Arc<TransferCoordinator>,
    pub user_auth: Arc<UserAuthService>,
    pub cards: Arc<CardService>,
    pub rates: Arc<dyn KeyRateProvider>,
    /// PostgreSQL handle for health checks (absent with the memory store)
    pub pg_db: Option<Arc<Database>>,
}

impl AppState {
    pub fn new(
        accounts: Arc<AccountService>,
        transfers: Arc<TransferCoordinator>,
        user_auth: Arc<UserAuthService>,
        cards: Arc<CardService>,
        rates: Arc<dyn KeyRateProvider>,
        pg_db: Option<Arc<Database>>,
    ) -> Self {
        Self {
            accounts,
            transfers,
            user_auth,
            cards,
            rates,
            pg_db,
        }
    }

    /// Wire every service over the given stores
    pub fn from_stores(
        config: &AppConfig,
        ledger: Arc<dyn LedgerStore>,
        users: Arc<dyn UserStore>,
        cards: Arc<dyn CardStore>,
        pg_db: Option<Arc<Database>>,
    ) -> Result<Self, RateError> {
        let rates = StubKeyRateProvider::from_config(&config.central_bank)?;
        Ok(Self::new(
            Arc::new(AccountService::new(ledger.clone())),
            Arc::new(TransferCoordinator::new(ledger, &config.transfer)),
            Arc::new(UserAuthService::new(
                users,
                config.auth.jwt_secret.clone(),
                config.auth.token_ttl_hours,
            )),
            Arc::new(CardService::new(cards)),
            Arc::new(rates),
            pg_db,
        ))
    }

    /// Everything in process memory; state is lost on exit
    pub fn in_memory(config: &AppConfig, ledger: MemoryLedger) -> Result<Self, RateError> {
        Self::from_stores(
            config,
            Arc::new(ledger),
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryCardStore::new()),
            None,
        )
    }
}
