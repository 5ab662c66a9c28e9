//! Card issuance
//!
//! PANs are 16 digits with a `4` issuer prefix and a Luhn check digit. The
//! CVV is returned once at issue time and stored only as an argon2 hash.

use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use std::sync::Arc;

use super::error::CardError;
use super::models::{Card, CardSummary, IssuedCard};
use super::store::CardStore;
use crate::core_types::{CardId, UserId};
use crate::user_auth::service::hash_secret;

const PAN_LEN: usize = 16;
const ISSUER_PREFIX: u8 = 4;
const VALIDITY_YEARS: i32 = 4;
const MAX_ISSUE_ATTEMPTS: u32 = 3;

/// Luhn check digit for `payload` (the number without its last digit)
fn luhn_check_digit(payload: &[u8]) -> u8 {
    let sum: u32 = payload
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            let d = d as u32;
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

pub fn is_luhn_valid(number: &str) -> bool {
    let Some(digits) = number
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect::<Option<Vec<u8>>>()
    else {
        return false;
    };
    match digits.split_last() {
        Some((&check, payload)) if !payload.is_empty() => luhn_check_digit(payload) == check,
        _ => false,
    }
}

fn generate_pan<R: Rng>(rng: &mut R) -> String {
    let mut digits = Vec::with_capacity(PAN_LEN);
    digits.push(ISSUER_PREFIX);
    while digits.len() < PAN_LEN - 1 {
        digits.push(rng.gen_range(0..10));
    }
    digits.push(luhn_check_digit(&digits));
    digits.iter().map(|d| char::from(b'0' + d)).collect()
}

fn generate_cvv<R: Rng>(rng: &mut R) -> String {
    format!("{:03}", rng.gen_range(0..1000))
}

/// `MM/YY`, `VALIDITY_YEARS` after `now`
fn expiry_from(now: DateTime<Utc>) -> String {
    format!("{:02}/{:02}", now.month(), (now.year() + VALIDITY_YEARS) % 100)
}

pub struct CardService {
    store: Arc<dyn CardStore>,
}

impl CardService {
    pub fn new(store: Arc<dyn CardStore>) -> Self {
        Self { store }
    }

    pub async fn issue(&self, user_id: UserId) -> Result<IssuedCard, CardError> {
        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let (number, cvv) = {
                let mut rng = rand::thread_rng();
                (generate_pan(&mut rng), generate_cvv(&mut rng))
            };
            let now = Utc::now();
            let card = Card {
                id: CardId::new(),
                user_id,
                number,
                expiry: expiry_from(now),
                cvv_hash: hash_secret(&cvv).map_err(|e| CardError::Internal(e.to_string()))?,
                created_at: now,
            };

            match self.store.insert(&card).await {
                Ok(()) => {
                    tracing::info!(card_id = %card.id, user_id = %user_id, "Card issued");
                    return Ok(IssuedCard {
                        id: card.id,
                        number: card.number,
                        expiry: card.expiry,
                        cvv,
                        created_at: card.created_at,
                    });
                }
                Err(CardError::DuplicateNumber) => {
                    tracing::warn!(attempt, "Generated PAN collided, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
        Err(CardError::DuplicateNumber)
    }

    pub async fn list(&self, user_id: UserId) -> Result<Vec<CardSummary>, CardError> {
        let cards = self.store.list_for_user(user_id).await?;
        Ok(cards.iter().map(CardSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::store::MemoryCardStore;
    use chrono::TimeZone;

    #[test]
    fn test_luhn_known_numbers() {
        assert!(is_luhn_valid("4111111111111111"));
        assert!(is_luhn_valid("79927398713"));
        assert!(!is_luhn_valid("4111111111111112"));
        assert!(!is_luhn_valid("4111-1111"));
        assert!(!is_luhn_valid("7"));
    }

    #[test]
    fn test_generated_pan_shape() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let pan = generate_pan(&mut rng);
            assert_eq!(pan.len(), PAN_LEN);
            assert!(pan.starts_with('4'));
            assert!(is_luhn_valid(&pan), "{pan}");
        }
    }

    #[test]
    fn test_expiry_is_four_years_out() {
        let now = Utc.with_ymd_and_hms(2026, 3, 15, 0, 0, 0).unwrap();
        assert_eq!(expiry_from(now), "03/30");
    }

    #[tokio::test]
    async fn test_issue_and_list_masks_number() {
        let svc = CardService::new(Arc::new(MemoryCardStore::new()));
        let user = UserId::new();
        let issued = svc.issue(user).await.unwrap();
        assert_eq!(issued.cvv.len(), 3);

        let listed = svc.list(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, issued.id);
        assert!(listed[0].number.starts_with("************"));
        assert!(listed[0].number.ends_with(&issued.number[12..]));
        assert!(svc.list(UserId::new()).await.unwrap().is_empty());
    }
}
