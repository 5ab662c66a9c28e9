//! User persistence

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::error::AuthError;
use super::models::User;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user; `DuplicateUser` if email or username is taken
    async fn insert(&self, user: &User) -> Result<(), AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &PgRow) -> Result<User, AuthError> {
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, user: &User) -> Result<(), AuthError> {
        sqlx::query(
            r#"INSERT INTO users (id, email, username, password_hash, created_at)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        let row = sqlx::query(
            r#"SELECT id, email, username, password_hash, created_at
               FROM users WHERE email = $1"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_user).transpose()
    }
}

/// In-memory users keyed by email
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> Result<(), AuthError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) || users.values().any(|u| u.username == user.username)
        {
            return Err(AuthError::DuplicateUser);
        }
        users.insert(user.email.clone(), user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.users.read().await.get(email).cloned())
    }
}
