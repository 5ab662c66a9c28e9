//! Corebank - minimal banking REST API
//!
//! Users register, open accounts, deposit, withdraw and transfer funds.
//! Every balance change goes through one unit of work so that a transfer
//! either debits, credits and records together or not at all.
//!
//! # Modules
//!
//! - [`core_types`] - Typed identifiers (AccountId, UserId, ...)
//! - [`money`] - Fixed-point monetary amounts
//! - [`ledger`] - Account store, units of work, PostgreSQL and memory backends
//! - [`transfer`] - Transfer coordinator with retries and idempotency
//! - [`account`] - Account opening and ownership checks
//! - [`user_auth`] - Registration, login and JWT middleware
//! - [`card`] - Card issuing
//! - [`central_bank`] - Key rate provider
//! - [`gateway`] - HTTP router, handlers and OpenAPI docs

// Core types - must be first!
pub mod core_types;
pub mod money;

// Configuration and ambient plumbing
pub mod config;
pub mod db;
pub mod logging;

// Banking core
pub mod account;
pub mod ledger;
pub mod transfer;

// Peripheral services
pub mod card;
pub mod central_bank;
pub mod user_auth;

pub mod gateway;

// Convenient re-exports at crate root
pub use core_types::{AccountId, CardId, TransactionId, UserId};
pub use money::{Money, MoneyError};
pub use transfer::{TransferCoordinator, TransferError};
