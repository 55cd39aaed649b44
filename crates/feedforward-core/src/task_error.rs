//! Retry classification for task handler failures.

use thiserror::Error;

/// Why a delivery of an evaluation task did not finish.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Another delivery may succeed: upstream timeouts, transient storage errors.
    #[error("{0}")]
    Recoverable(anyhow::Error),
    /// Redelivery cannot help: unknown request id, malformed payload.
    #[error("{0}")]
    Unrecoverable(anyhow::Error),
}

impl TaskError {
    pub fn recoverable(err: impl Into<anyhow::Error>) -> Self {
        Self::Recoverable(err.into())
    }

    pub fn unrecoverable(err: impl Into<anyhow::Error>) -> Self {
        Self::Unrecoverable(err.into())
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable(_))
    }
}
