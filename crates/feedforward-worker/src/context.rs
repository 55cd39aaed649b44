//! Task handler context trait
//!
//! The API implements this trait for its application state so the local
//! worker pool and the HTTP task endpoint run the same processing path.

use async_trait::async_trait;
use std::sync::Arc;

use feedforward_core::models::{TaskOutcome, TaskPayload};
use feedforward_core::TaskError;

/// Context for task dispatch.
///
/// The worker holds a weak reference and calls `dispatch_task` for every
/// delivered payload. Delivery is at-least-once, so implementations must
/// tolerate seeing the same payload more than once.
#[async_trait]
pub trait TaskHandlerContext: Send + Sync {
    async fn dispatch_task(self: Arc<Self>, payload: &TaskPayload)
        -> Result<TaskOutcome, TaskError>;
}
