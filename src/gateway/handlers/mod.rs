//! HTTP handlers, one submodule per resource
//!
//! Re-exported with globs so the utoipa `__path_*` items travel with each
//! handler function.

pub mod account;
pub mod card;
pub mod health;
pub mod rate;
pub mod transfer;

pub use account::*;
pub use card::*;
pub use health::*;
pub use rate::*;
pub use transfer::*;
