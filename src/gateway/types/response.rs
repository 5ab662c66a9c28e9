//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `ApiError` / `ApiResult<T>`: handler error path, rendered in the same envelope
//! - `error_codes`: Standard error code constants

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::account::AccountError;
use crate::card::CardError;
use crate::central_bank::RateError;
use crate::transfer::TransferError;
use crate::user_auth::AuthError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

// ============================================================================
// Handler results
// ============================================================================

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

/// Error half of [`ApiResult`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    pub fn unauthorized(code: i32, msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            msg,
        )
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
        )
    }

    pub fn into_err<T>(self) -> Result<T, ApiError> {
        Err(self)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.code, self.msg))).into_response()
    }
}

fn status_of(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<TransferError> for ApiError {
    fn from(e: TransferError) -> Self {
        let code = match &e {
            TransferError::NotFound(_) => error_codes::ACCOUNT_NOT_FOUND,
            TransferError::InsufficientFunds(_) => error_codes::INSUFFICIENT_FUNDS,
            TransferError::InvalidArgument(_) => error_codes::INVALID_PARAMETER,
            TransferError::StorageUnavailable(_) => error_codes::SERVICE_UNAVAILABLE,
            TransferError::Internal(_) => error_codes::INTERNAL_ERROR,
            TransferError::InconsistentState(_) => error_codes::INCONSISTENT_STATE,
        };
        // Internal details stay in the logs
        let msg = match &e {
            TransferError::StorageUnavailable(_) => "Storage temporarily unavailable".to_string(),
            TransferError::Internal(detail) => {
                tracing::error!("Transfer storage fault: {}", detail);
                "Internal error".to_string()
            }
            TransferError::InconsistentState(_) => {
                "Transfer outcome unknown, reconciliation pending".to_string()
            }
            other => other.to_string(),
        };
        Self::new(status_of(e.http_status()), code, msg)
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        let code = match &e {
            AccountError::NotFound(_) => error_codes::ACCOUNT_NOT_FOUND,
            AccountError::Forbidden => error_codes::FORBIDDEN,
            AccountError::InvalidInput(_) => error_codes::INVALID_PARAMETER,
            AccountError::Storage(_) => error_codes::SERVICE_UNAVAILABLE,
        };
        let msg = match &e {
            AccountError::Storage(detail) => {
                tracing::error!("Account storage failure: {}", detail);
                "Storage temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };
        Self::new(status_of(e.http_status()), code, msg)
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        let code = match &e {
            AuthError::InvalidInput(_) => error_codes::INVALID_PARAMETER,
            AuthError::DuplicateUser => error_codes::CONFLICT,
            AuthError::InvalidCredentials | AuthError::InvalidToken => error_codes::AUTH_FAILED,
            AuthError::Storage(_) => error_codes::SERVICE_UNAVAILABLE,
            AuthError::Internal(_) => error_codes::INTERNAL_ERROR,
        };
        let msg = match &e {
            AuthError::Storage(detail) | AuthError::Internal(detail) => {
                tracing::error!("Auth failure: {}", detail);
                "Authentication service error".to_string()
            }
            other => other.to_string(),
        };
        Self::new(status_of(e.http_status()), code, msg)
    }
}

impl From<CardError> for ApiError {
    fn from(e: CardError) -> Self {
        tracing::error!("Card operation failed: {}", e);
        match e {
            CardError::Storage(_) => Self::service_unavailable("Storage temporarily unavailable"),
            _ => Self::internal("Card operation failed"),
        }
    }
}

impl From<RateError> for ApiError {
    fn from(e: RateError) -> Self {
        tracing::error!("Key rate lookup failed: {}", e);
        Self::service_unavailable("Key rate unavailable")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_FUNDS: i32 = 1002;
    pub const CONFLICT: i32 = 1009;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const FORBIDDEN: i32 = 2003;

    // Resource errors (4xxx)
    pub const ACCOUNT_NOT_FOUND: i32 = 4001;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const INCONSISTENT_STATE: i32 = 5002;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::AccountId;

    #[test]
    fn test_success_envelope() {
        let json = serde_json::to_value(ApiResponse::success(42)).unwrap();
        assert_eq!(json, serde_json::json!({"code": 0, "msg": "ok", "data": 42}));
    }

    #[test]
    fn test_error_envelope_has_no_data() {
        let json = serde_json::to_value(ApiResponse::<()>::error(1001, "bad")).unwrap();
        assert_eq!(json, serde_json::json!({"code": 1001, "msg": "bad"}));
    }

    #[test]
    fn test_transfer_error_mapping() {
        let err = ApiError::from(TransferError::InsufficientFunds(AccountId::new()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, error_codes::INSUFFICIENT_FUNDS);

        let err = ApiError::from(TransferError::NotFound(AccountId::new()));
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = ApiError::from(TransferError::Internal("decode failed".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, error_codes::INTERNAL_ERROR);
        assert!(!err.msg.contains("decode failed"));

        let err = ApiError::from(TransferError::InconsistentState("commit lost".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.msg.contains("commit lost"));
    }

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(ApiError::from(AuthError::DuplicateUser).status, StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(AuthError::InvalidCredentials).status,
            StatusCode::UNAUTHORIZED
        );
    }
}
