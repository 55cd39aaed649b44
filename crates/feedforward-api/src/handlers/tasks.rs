use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use feedforward_core::models::{TaskOutcome, TaskPayload};

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::task_handlers::{EvaluationTaskHandler, TaskHandler};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskProcessResponse {
    pub status: &'static str,
    pub request_id: Uuid,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

/// Entry point for an external task dispatcher. Any non-2xx answer asks it to redeliver.
#[utoipa::path(
    post,
    path = "/api/v1/tasks/process",
    tag = "tasks",
    request_body = TaskPayload,
    responses(
        (status = 200, description = "Processed, or already finished", body = TaskProcessResponse),
        (status = 400, description = "Malformed payload", body = ErrorResponse),
        (status = 404, description = "Unknown request id", body = ErrorResponse),
        (status = 502, description = "AI service failed", body = ErrorResponse),
        (status = 504, description = "AI service timed out", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all, fields(request_id = %payload.request_id))]
pub async fn process_task(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<TaskPayload>,
) -> Result<Json<TaskProcessResponse>, HttpAppError> {
    let outcome = EvaluationTaskHandler.process(&payload, state).await?;
    Ok(Json(TaskProcessResponse {
        status: "success",
        request_id: payload.request_id,
        outcome,
    }))
}
