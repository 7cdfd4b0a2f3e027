//! Core domain errors.

use thiserror::Error;

/// Core domain errors for TaskRelay.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Rejected by validation or parsing.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
