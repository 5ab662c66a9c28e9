use axum::extract::State;
use std::sync::Arc;

use super::models::{AuthResponse, LoginRequest, RegisterRequest, RegisterResponse};
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, ApiJson, ApiResponse, ApiResult, created, ok};

/// Register a new user
///
/// POST /register
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<RegisterResponse>),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username or email already exists")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<RegisterResponse> {
    match state.user_auth.register(req).await {
        Ok(user_id) => created(RegisterResponse { user_id }),
        Err(e) => {
            tracing::warn!("Registration rejected: {}", e);
            ApiError::from(e).into_err()
        }
    }
}

/// Login user
///
/// POST /login
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<AuthResponse> {
    match state.user_auth.login(req).await {
        Ok(resp) => ok(resp),
        Err(e) => {
            tracing::warn!("Login failed: {}", e);
            ApiError::from(e).into_err()
        }
    }
}
