use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Username or email already exists")]
    DuplicateUser,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn http_status(&self) -> u16 {
        match self {
            AuthError::InvalidInput(_) => 400,
            AuthError::DuplicateUser => 409,
            AuthError::InvalidCredentials | AuthError::InvalidToken => 401,
            AuthError::Storage(_) => 503,
            AuthError::Internal(_) => 500,
        }
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AuthError::DuplicateUser,
            _ => AuthError::Storage(e.to_string()),
        }
    }
}
