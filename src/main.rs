//! Corebank HTTP gateway
//!
//! ```text
//! corebank [--env dev|prod] [--port N] [--store postgres|memory]
//! ```
//!
//! `--store memory` keeps everything in process memory and needs no
//! database; anything else connects to `postgres_url` and runs migrations.

use std::sync::Arc;

use anyhow::{Context, bail};

use corebank::card::PgCardStore;
use corebank::config::AppConfig;
use corebank::db::Database;
use corebank::gateway::{self, state::AppState};
use corebank::ledger::{MemoryLedger, PgLedger};
use corebank::user_auth::PgUserStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreKind {
    Postgres,
    Memory,
}

fn arg_value(name: &str) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1).cloned())
}

fn get_env() -> String {
    arg_value("--env")
        .or_else(|| arg_value("-e"))
        .unwrap_or_else(|| "dev".to_string())
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    arg_value("--port").and_then(|p| p.parse().ok())
}

fn get_store() -> anyhow::Result<StoreKind> {
    match arg_value("--store").as_deref() {
        None | Some("postgres") => Ok(StoreKind::Postgres),
        Some("memory") => Ok(StoreKind::Memory),
        Some(other) => bail!("unknown --store '{}', expected postgres|memory", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let store = get_store()?;
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    let _log_guard = corebank::logging::init_logging(&app_config);

    tracing::info!(env = %env, store = ?store, "Starting corebank gateway");

    let state = match store {
        StoreKind::Memory => {
            tracing::warn!("Memory store selected: data is lost on exit");
            AppState::in_memory(&app_config, MemoryLedger::new())?
        }
        StoreKind::Postgres => {
            let url = app_config
                .postgres_url
                .as_deref()
                .context("postgres_url (or DATABASE_URL) is required for --store postgres")?;
            let db = Database::connect(url).await?;
            db.migrate().await?;
            let pool = db.pool().clone();
            AppState::from_stores(
                &app_config,
                Arc::new(PgLedger::new(pool.clone())),
                Arc::new(PgUserStore::new(pool.clone())),
                Arc::new(PgCardStore::new(pool)),
                Some(Arc::new(db)),
            )?
        }
    };

    gateway::run_server(
        &app_config.gateway.host,
        app_config.gateway.port,
        Arc::new(state),
    )
    .await
}
