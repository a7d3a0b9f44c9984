//! API errors rendered as `{"error": "message"}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// - `BadRequest` → 400
/// - `Internal` → 500
/// - `Upstream` → 502 (no shard node answered)
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
    Upstream(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };
        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<turbo_core::Error> for ApiError {
    fn from(e: turbo_core::Error) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("invalid request body: {e}"))
    }
}
