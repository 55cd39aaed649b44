mod evaluation_handler;

pub use evaluation_handler::EvaluationTaskHandler;

use async_trait::async_trait;
use std::sync::Arc;

use crate::state::AppState;
use feedforward_core::models::{TaskOutcome, TaskPayload};
use feedforward_core::AppError;

/// Processes one task payload against the shared application state.
///
/// Both the local queue and the HTTP task endpoint call through this trait,
/// so a redelivery from either side takes the same path.
#[async_trait]
pub trait TaskHandler {
    async fn process(
        &self,
        payload: &TaskPayload,
        state: Arc<AppState>,
    ) -> Result<TaskOutcome, AppError>;
}
