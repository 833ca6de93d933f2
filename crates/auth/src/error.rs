//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    /// Credentials did not match.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Session not found or expired.
    #[error("Invalid session")]
    InvalidSession,

    /// Session storage error.
    #[error("Session store error: {0}")]
    Store(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
