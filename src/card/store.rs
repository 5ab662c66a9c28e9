use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tokio::sync::RwLock;

use super::error::CardError;
use super::models::Card;
use crate::core_types::UserId;

#[async_trait]
pub trait CardStore: Send + Sync {
    /// `DuplicateNumber` if the PAN is already taken
    async fn insert(&self, card: &Card) -> Result<(), CardError>;

    /// Cards of a user, oldest first
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Card>, CardError>;
}

pub struct PgCardStore {
    pool: PgPool,
}

impl PgCardStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_card(row: &PgRow) -> Result<Card, CardError> {
    Ok(Card {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        number: row.try_get("number")?,
        expiry: row.try_get("expiry")?,
        cvv_hash: row.try_get("cvv_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl CardStore for PgCardStore {
    async fn insert(&self, card: &Card) -> Result<(), CardError> {
        sqlx::query(
            r#"INSERT INTO cards (id, user_id, number, expiry, cvv_hash, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(card.id)
        .bind(card.user_id)
        .bind(&card.number)
        .bind(&card.expiry)
        .bind(&card.cvv_hash)
        .bind(card.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Card>, CardError> {
        let rows = sqlx::query(
            r#"SELECT id, user_id, number, expiry, cvv_hash, created_at
               FROM cards WHERE user_id = $1
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_card).collect()
    }
}

#[derive(Default)]
pub struct MemoryCardStore {
    cards: RwLock<Vec<Card>>,
}

impl MemoryCardStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CardStore for MemoryCardStore {
    async fn insert(&self, card: &Card) -> Result<(), CardError> {
        let mut cards = self.cards.write().await;
        if cards.iter().any(|c| c.number == card.number) {
            return Err(CardError::DuplicateNumber);
        }
        cards.push(card.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Card>, CardError> {
        Ok(self
            .cards
            .read()
            .await
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }
}
