use async_trait::async_trait;

use feedforward_core::models::TaskPayload;
use feedforward_core::AppError;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("task queue is closed")]
    QueueClosed,

    #[error("task dispatcher request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("task dispatcher rejected task with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        AppError::InternalWithSource {
            message: "Failed to enqueue processing task".to_string(),
            source: err.into(),
        }
    }
}

/// Hands a processing task to whatever delivers it to the task handler.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn enqueue(&self, payload: TaskPayload) -> Result<(), DispatchError>;

    /// Short name used by the health endpoint.
    fn kind(&self) -> &'static str;

    fn is_healthy(&self) -> bool {
        true
    }
}
