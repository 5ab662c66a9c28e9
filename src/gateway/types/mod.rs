//! Gateway types module
//!
//! ## Input Types
//! - [`ApiJson`]: JSON body extractor whose rejections use the API envelope
//! - [`ApiPath`]: path extractor, same treatment
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: Unified API response wrapper
//! - [`ApiError`] / [`ApiResult<T>`]: handler results
//!
//! ## Submodules
//! - [`response`]: Response types and error codes

pub mod response;

use axum::extract::{FromRequest, FromRequestParts};

pub use response::{ApiError, ApiResponse, ApiResult, created, error_codes, ok};

/// `axum::Json` with envelope-shaped rejections
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with envelope-shaped rejections
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
