//! Account management module
//!
//! Opening, listing and ownership-checked lookup of accounts. Balances are
//! owned by the Ledger Store; this module never mutates them.

pub mod error;
pub mod service;
pub mod validation;

pub use error::AccountError;
pub use service::AccountService;
pub use validation::{CurrencyCode, ValidationError};
