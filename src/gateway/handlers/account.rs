//! Account handlers: opening, lookup, history, deposit and withdrawal

use std::sync::Arc;

use axum::{Extension, body::Bytes, extract::State};
use serde::Deserialize;
use utoipa::ToSchema;

use super::super::state::AppState;
use super::super::types::{ApiError, ApiJson, ApiPath, ApiResponse, ApiResult, created, ok};
use crate::core_types::AccountId;
use crate::ledger::{Account, Transaction};
use crate::money::Money;
use crate::user_auth::AuthenticatedUser;

/// Open account request; the body may be omitted entirely
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct OpenAccountRequest {
    /// ISO-4217 code, defaults to RUB
    #[schema(example = "RUB")]
    pub currency: Option<String>,
}

/// Deposit / withdrawal request
#[derive(Debug, Deserialize, ToSchema)]
pub struct AmountRequest {
    /// Decimal string with at most two fractional digits
    #[schema(value_type = String, example = "100.50")]
    pub amount: Money,
    /// Optional idempotency key
    pub client_ref: Option<String>,
}

/// Open a new account
///
/// POST /accounts
#[utoipa::path(
    post,
    path = "/accounts",
    request_body(content = OpenAccountRequest, description = "Optional body"),
    responses(
        (status = 201, description = "Account opened", body = ApiResponse<Account>),
        (status = 400, description = "Invalid currency"),
        (status = 401, description = "Authentication failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    body: Bytes,
) -> ApiResult<Account> {
    let req: OpenAccountRequest = if body.iter().all(u8::is_ascii_whitespace) {
        OpenAccountRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(e.to_string()))?
    };

    let account = state
        .accounts
        .open(user.user_id, req.currency.as_deref())
        .await?;
    created(account)
}

/// List the caller's accounts
///
/// GET /accounts
#[utoipa::path(
    get,
    path = "/accounts",
    responses(
        (status = 200, description = "Accounts of the caller", body = ApiResponse<Vec<Account>>),
        (status = 401, description = "Authentication failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn list_accounts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<Vec<Account>> {
    ok(state.accounts.list(user.user_id).await?)
}

/// Get one account with its balance
///
/// GET /accounts/{id}
#[utoipa::path(
    get,
    path = "/accounts/{id}",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account", body = ApiResponse<Account>),
        (status = 403, description = "Account belongs to another user"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<AccountId>,
) -> ApiResult<Account> {
    ok(state.accounts.get_owned(user.user_id, id).await?)
}

/// Ledger entries of an account, oldest first
///
/// GET /accounts/{id}/transactions
#[utoipa::path(
    get,
    path = "/accounts/{id}/transactions",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Ordered ledger entries", body = ApiResponse<Vec<Transaction>>),
        (status = 403, description = "Account belongs to another user"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn get_transactions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<AccountId>,
) -> ApiResult<Vec<Transaction>> {
    state.accounts.get_owned(user.user_id, id).await?;
    ok(state.transfers.get_transactions(id).await?)
}

/// Credit an account
///
/// POST /accounts/{id}/deposit
#[utoipa::path(
    post,
    path = "/accounts/{id}/deposit",
    params(("id" = String, Path, description = "Account id")),
    request_body = AmountRequest,
    responses(
        (status = 200, description = "Deposit recorded", body = ApiResponse<Transaction>),
        (status = 400, description = "Invalid amount"),
        (status = 403, description = "Account belongs to another user"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn deposit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<AccountId>,
    ApiJson(req): ApiJson<AmountRequest>,
) -> ApiResult<Transaction> {
    state.accounts.get_owned(user.user_id, id).await?;
    ok(state.transfers.deposit(id, req.amount, req.client_ref).await?)
}

/// Debit an account
///
/// POST /accounts/{id}/withdraw
#[utoipa::path(
    post,
    path = "/accounts/{id}/withdraw",
    params(("id" = String, Path, description = "Account id")),
    request_body = AmountRequest,
    responses(
        (status = 200, description = "Withdrawal recorded", body = ApiResponse<Transaction>),
        (status = 400, description = "Invalid amount or insufficient funds"),
        (status = 403, description = "Account belongs to another user"),
        (status = 404, description = "Account not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn withdraw(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(id): ApiPath<AccountId>,
    ApiJson(req): ApiJson<AmountRequest>,
) -> ApiResult<Transaction> {
    state.accounts.get_owned(user.user_id, id).await?;
    ok(state.transfers.withdraw(id, req.amount, req.client_ref).await?)
}
