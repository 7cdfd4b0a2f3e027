//! Store errors.

use thiserror::Error;

/// Errors raised by a [`crate::Store`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database rejected or failed the operation.
    #[error("Database error: {0}")]
    Backend(#[from] sqlx::Error),

    /// A JSON document column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value does not match the domain model.
    #[error("Corrupt row: {0}")]
    Decode(String),
}
