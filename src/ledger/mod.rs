//! Ledger Store
//!
//! Owns account balances and the append-only transaction log. Exposes
//! single-account reads and a unit-of-work handle whose conditional balance
//! adjustments and ledger entries become visible together or not at all.
//!
//! ## Invariants
//! - A balance never drops below zero, not even between the legs of a
//!   transfer that has not committed.
//! - Every committed balance change is described by exactly one ledger entry.

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use error::LedgerError;
pub use memory::{Fault, FaultPlan, MemoryLedger};
pub use models::{Account, NewTransaction, Transaction, TransactionKind, DEFAULT_CURRENCY};
pub use postgres::PgLedger;
pub use store::{AccountRepository, LedgerStore, LedgerUnit};
