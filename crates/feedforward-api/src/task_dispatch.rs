//! TaskHandlerContext implementation for AppState.
//!
//! Maps handler errors onto the queue's retry decision.

use async_trait::async_trait;
use std::sync::Arc;

use feedforward_core::models::{TaskOutcome, TaskPayload};
use feedforward_core::{AppError, TaskError};
use feedforward_worker::TaskHandlerContext;

use crate::state::AppState;
use crate::task_handlers::{EvaluationTaskHandler, TaskHandler};

/// Missing requests and malformed payloads will not get better on retry.
pub(crate) fn into_task_error(error: AppError) -> TaskError {
    match error {
        e @ (AppError::NotFound(_) | AppError::BadRequest(_) | AppError::Validation { .. }) => {
            TaskError::unrecoverable(e)
        }
        e => TaskError::recoverable(e),
    }
}

#[async_trait]
impl TaskHandlerContext for AppState {
    async fn dispatch_task(self: Arc<Self>, payload: &TaskPayload) -> Result<TaskOutcome, TaskError> {
        EvaluationTaskHandler
            .process(payload, self)
            .await
            .map_err(into_task_error)
    }
}
