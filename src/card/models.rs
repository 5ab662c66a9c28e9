use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::core_types::{CardId, UserId};

/// Stored card row; the CVV only exists as an argon2 hash
#[derive(Debug, Clone)]
pub struct Card {
    pub id: CardId,
    pub user_id: UserId,
    pub number: String,
    /// `MM/YY`
    pub expiry: String,
    pub cvv_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Issue response: the only time the CVV leaves the service
#[derive(Debug, Serialize, ToSchema)]
pub struct IssuedCard {
    pub id: CardId,
    #[schema(example = "4276550012345678")]
    pub number: String,
    #[schema(example = "10/30")]
    pub expiry: String,
    #[schema(example = "123")]
    pub cvv: String,
    pub created_at: DateTime<Utc>,
}

/// Listing view with the PAN masked
#[derive(Debug, Serialize, ToSchema)]
pub struct CardSummary {
    pub id: CardId,
    #[schema(example = "************5678")]
    pub number: String,
    pub expiry: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Card> for CardSummary {
    fn from(card: &Card) -> Self {
        let visible = card.number.len().saturating_sub(4);
        Self {
            id: card.id,
            number: format!("{}{}", "*".repeat(visible), &card.number[visible..]),
            expiry: card.expiry.clone(),
            created_at: card.created_at,
        }
    }
}
