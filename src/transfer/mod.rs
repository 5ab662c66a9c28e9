//! Funds Transfer
//!
//! Moves money between accounts (and in and out of single accounts) as one
//! unit of work on the Ledger Store.
//!
//! # Flow
//!
//! ```text
//! pre-checks → begin → debit/credit legs (ascending account id) → record → commit
//!                 ↓              ↓                                    ↓
//!            retry (transient) / rollback (refusal)        ALERT (outcome unknown)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Conservation**: a committed transfer changes the sum of its two
//!    balances by zero.
//! 2. **No negative balance**: every debit is a conditional update that
//!    refuses to go below zero, so there is no read-then-write window.
//! 3. **All or nothing**: legs and ledger entry share one unit of work.
//! 4. **No silent loss**: an unknown commit outcome is escalated, never
//!    retried or swallowed.

pub mod coordinator;
pub mod error;
pub mod retry;

pub use coordinator::{Movement, TransferCoordinator};
pub use error::TransferError;
pub use retry::RetryPolicy;
