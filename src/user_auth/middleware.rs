use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::gateway::{
    state::AppState,
    types::{ApiError, error_codes},
};

/// Resolve `Authorization: Bearer <jwt>` into an [`AuthenticatedUser`]
/// request extension
///
/// [`AuthenticatedUser`]: super::AuthenticatedUser
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract Authorization header
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            ApiError::unauthorized(error_codes::MISSING_AUTH, "Missing Authorization header")
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized(error_codes::AUTH_FAILED, "Invalid token format"))?;

    // 2. Verify token
    let user = state.user_auth.verify_token(token.trim()).map_err(|_| {
        ApiError::unauthorized(error_codes::AUTH_FAILED, "Invalid or expired token")
    })?;

    // 3. Inject typed caller identity
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
