//! Error types for work executors.

use thiserror::Error;

/// Errors that prevent an executor from producing an outcome.
///
/// A process that runs and exits non-zero is not an error; see
/// [`crate::ExecutionOutcome::success`].
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Executable not found.
    #[error("Executor not found at '{0}'")]
    NotFound(String),

    /// Failed to spawn the process.
    #[error("Failed to spawn executor: {0}")]
    Spawn(#[source] std::io::Error),

    /// I/O failure while collecting the process output.
    #[error("Executor I/O error: {0}")]
    Io(#[from] std::io::Error),
}
