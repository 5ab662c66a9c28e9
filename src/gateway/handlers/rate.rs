use std::sync::Arc;

use axum::extract::State;

use super::super::state::AppState;
use super::super::types::{ApiResponse, ApiResult, ok};
use crate::central_bank::KeyRate;

/// Current central-bank key rate and the derived lending rate
#[utoipa::path(
    get,
    path = "/rates/key",
    responses(
        (status = 200, description = "Key rate", body = ApiResponse<KeyRate>),
        (status = 401, description = "Authentication failed"),
        (status = 503, description = "Rate source unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Rates"
)]
pub async fn get_key_rate(State(state): State<Arc<AppState>>) -> ApiResult<KeyRate> {
    ok(state.rates.key_rate().await?)
}
