use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CardError {
    #[error("Card number already issued")]
    DuplicateNumber,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CardError {
    pub fn http_status(&self) -> u16 {
        match self {
            CardError::Storage(_) => 503,
            CardError::DuplicateNumber | CardError::Internal(_) => 500,
        }
    }
}

impl From<sqlx::Error> for CardError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => CardError::DuplicateNumber,
            _ => CardError::Storage(e.to_string()),
        }
    }
}
