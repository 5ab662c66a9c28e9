use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::core_types::UserId;

/// Stored user row
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (user_id as string)
    pub exp: usize,  // Expiration time (as UTC timestamp)
    pub iat: usize,  // Issued at
}

/// Caller identity resolved by the JWT middleware
///
/// Inserted into request extensions; handlers take it with
/// `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// User Registration Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    #[schema(example = "user1")]
    pub username: String,
    #[validate(email)]
    #[schema(example = "user1@example.com")]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    #[schema(example = "password123")]
    pub password: String,
}

/// User Login Request
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "user1@example.com")]
    pub email: String,
    #[schema(example = "password123")]
    pub password: String,
}

/// Registration result
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user_id: UserId,
}

/// Auth Response (JWT)
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}
