//! Server error types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalog_store::StoreError;
use serde_json::json;

/// Error codes returned in JSON error bodies.
pub mod error_codes {
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const RESOURCE_NOT_FOUND: &str = "RESOURCE_NOT_FOUND";
    pub const AUTHENTICATION_REQUIRED: &str = "AUTHENTICATION_REQUIRED";
    pub const CONFLICT: &str = "CONFLICT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Payload failed schema validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication required.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Authentication error.
    #[error("Auth error: {0}")]
    Auth(#[from] auth::AuthError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ServerError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, error_codes::INVALID_REQUEST, msg.clone())
            }
            ServerError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, error_codes::VALIDATION_FAILED, msg.clone())
            }
            ServerError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, error_codes::RESOURCE_NOT_FOUND, msg.clone())
            }
            ServerError::AuthenticationRequired => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTHENTICATION_REQUIRED,
                "Authentication required".to_string(),
            ),
            ServerError::Conflict(msg) => {
                (StatusCode::CONFLICT, error_codes::CONFLICT, msg.clone())
            }
            ServerError::Store(e) => match e {
                StoreError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, error_codes::RESOURCE_NOT_FOUND, e.to_string())
                }
                StoreError::AlreadyExists { .. } => {
                    (StatusCode::CONFLICT, error_codes::CONFLICT, e.to_string())
                }
                other => {
                    (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR, other.to_string())
                }
            },
            ServerError::Auth(e) => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTHENTICATION_REQUIRED,
                e.to_string(),
            ),
            ServerError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR, msg.clone())
            }
        };

        let body = json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        (status, Json(body)).into_response()
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
