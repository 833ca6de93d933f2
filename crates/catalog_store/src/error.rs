//! Catalog store error types.

use thiserror::Error;

/// Errors that can occur during catalog store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Entity not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Duplicate entity.
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// An item with the same identity key already exists for the owning
    /// user and item type. Callers recover by re-fetching the winning row.
    #[error("item with identity {identity_key} already exists for type {item_type_slug}")]
    IdentityConflict {
        item_type_slug: String,
        identity_key: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Creates a not found error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates an already exists error.
    pub fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.into(),
        }
    }
}

/// Result type for catalog store operations.
pub type StoreResult<T> = Result<T, StoreError>;
