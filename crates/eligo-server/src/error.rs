//! Error types for the server.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use eligo_store::StoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Server error type.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Bad request.
    #[error("{0}")]
    BadRequest(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Recording store failure.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Request body was not valid JSON.
    pub fn invalid_json() -> Self {
        Self::BadRequest("Invalid JSON".to_string())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ServerError::RateLimitExceeded => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded")
            }
            ServerError::Store(e @ StoreError::Capacity(_)) => {
                (StatusCode::TOO_MANY_REQUESTS, e.code())
            }
            ServerError::Store(e @ StoreError::Access(_)) => (StatusCode::FORBIDDEN, e.code()),
            ServerError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.code()),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }

    /// Message shown to the client. Internal fault text stays in the logs.
    fn public_message(&self) -> String {
        match self {
            ServerError::BadRequest(msg) => msg.clone(),
            ServerError::RateLimitExceeded => "Rate limit exceeded".to_string(),
            ServerError::Store(StoreError::Capacity(_)) => {
                "Recording store is busy. Please try again later.".to_string()
            }
            ServerError::Store(StoreError::Access(_)) => {
                "Access denied to the recording store.".to_string()
            }
            ServerError::Store(_) => "Failed to save the recording.".to_string(),
            ServerError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let error = self.to_string();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %error, "Server error");
        } else {
            tracing::warn!(status = %status, code, error = %error, "Client error");
        }

        let body = ErrorResponse {
            code: code.to_string(),
            message: self.public_message(),
        };

        (status, Json(body)).into_response()
    }
}
