//! User registration, login and JWT verification

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod service;
pub mod store;

pub use error::AuthError;
pub use middleware::jwt_auth_middleware;
pub use models::{AuthResponse, AuthenticatedUser, Claims, LoginRequest, RegisterRequest};
pub use service::UserAuthService;
pub use store::{MemoryUserStore, PgUserStore, UserStore};
