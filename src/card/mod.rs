//! Payment cards issued to users

pub mod error;
pub mod models;
pub mod service;
pub mod store;

pub use error::CardError;
pub use models::{Card, CardSummary, IssuedCard};
pub use service::CardService;
pub use store::{CardStore, MemoryCardStore, PgCardStore};
