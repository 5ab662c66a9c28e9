//! Transfer handler

use std::sync::Arc;

use axum::{Extension, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiJson, ApiResponse, ApiResult, ok};
use crate::core_types::AccountId;
use crate::ledger::Transaction;
use crate::money::Money;
use crate::user_auth::AuthenticatedUser;

/// Transfer request
#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferRequest {
    pub from_account: AccountId,
    pub to_account: AccountId,
    /// Decimal string with at most two fractional digits
    #[schema(value_type = String, example = "100.50")]
    pub amount: Money,
    /// Optional idempotency key; a retry with the same key returns the
    /// original transaction
    pub client_ref: Option<String>,
}

/// Transfer result
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferResponse {
    #[schema(example = "success")]
    pub status: String,
    pub transaction: Transaction,
}

/// Move funds between two accounts
///
/// POST /transfer
///
/// The caller must own `from_account`; `to_account` may belong to anyone.
#[utoipa::path(
    post,
    path = "/transfer",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer committed", body = ApiResponse<TransferResponse>),
        (status = 400, description = "Invalid amount or insufficient funds"),
        (status = 401, description = "Authentication failed"),
        (status = 403, description = "Source account belongs to another user"),
        (status = 404, description = "Account not found"),
        (status = 503, description = "Storage unavailable")
    ),
    security(("bearer_auth" = [])),
    tag = "Transfer"
)]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(req): ApiJson<TransferRequest>,
) -> ApiResult<TransferResponse> {
    state
        .accounts
        .get_owned(user.user_id, req.from_account)
        .await?;

    tracing::info!(
        user_id = %user.user_id,
        from = %req.from_account,
        to = %req.to_account,
        amount = %req.amount,
        "[TRANSFER] request"
    );

    let transaction = state
        .transfers
        .transfer(req.from_account, req.to_account, req.amount, req.client_ref)
        .await?;

    ok(TransferResponse {
        status: "success".to_string(),
        transaction,
    })
}
