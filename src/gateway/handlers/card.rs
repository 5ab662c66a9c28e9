use std::sync::Arc;

use axum::{Extension, extract::State};

use super::super::state::AppState;
use super::super::types::{ApiResponse, ApiResult, created, ok};
use crate::card::{CardSummary, IssuedCard};
use crate::user_auth::AuthenticatedUser;

/// Issue a card to the caller
///
/// The CVV is only ever returned by this call.
#[utoipa::path(
    post,
    path = "/cards",
    responses(
        (status = 201, description = "Card issued", body = ApiResponse<IssuedCard>),
        (status = 401, description = "Authentication failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Cards"
)]
pub async fn issue_card(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<IssuedCard> {
    created(state.cards.issue(user.user_id).await?)
}

/// List the caller's cards with masked numbers
#[utoipa::path(
    get,
    path = "/cards",
    responses(
        (status = 200, description = "Cards of the caller", body = ApiResponse<Vec<CardSummary>>),
        (status = 401, description = "Authentication failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Cards"
)]
pub async fn list_cards(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Vec<CardSummary>> {
    ok(state.cards.list(user.user_id).await?)
}
