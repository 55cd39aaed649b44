use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use feedforward_core::models::{
    EvaluationRequest, ProcessingResult, RequestStatus, TaskOutcome, TaskPayload,
};
use feedforward_core::{AppError, ErrorMetadata};

use super::TaskHandler;
use crate::services::ai_client::{timeout_error, AiProcessingRequest};
use crate::services::report_delivery::deliver_report;
use crate::state::AppState;

/// Drives one evaluation request from `pending` to a terminal state.
pub struct EvaluationTaskHandler;

#[async_trait]
impl TaskHandler for EvaluationTaskHandler {
    #[tracing::instrument(skip(self, payload, state), fields(request_id = %payload.request_id))]
    async fn process(
        &self,
        payload: &TaskPayload,
        state: Arc<AppState>,
    ) -> Result<TaskOutcome, AppError> {
        let request_id = payload.request_id;
        let mut request = state
            .repository
            .get(request_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Evaluation request {} not found", request_id))
            })?;

        if request.is_terminal() {
            tracing::info!(status = %request.status, "Request already terminal, skipping");
            return Ok(TaskOutcome::AlreadyTerminal {
                status: request.status,
            });
        }

        request.mark_processing(Utc::now())?;
        if let Err(e) = state.repository.update(&request).await {
            return Err(fail_request(&state, request_id, e, 0).await);
        }
        tracing::info!("Processing evaluation request");

        let started = Instant::now();
        let processed = call_ai(&state, &request).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let stored = match processed {
            Ok(result) => state.repository.save_result(&result).await.map(|()| result),
            Err(e) => Err(e),
        };
        state
            .observability
            .record_outcome(request_id, stored.is_ok(), duration_ms);
        let result = match stored {
            Ok(result) => result,
            Err(e) => return Err(fail_request(&state, request_id, e, duration_ms).await),
        };

        // A concurrent delivery may have finished first
        let mut current = match state.repository.get(request_id).await {
            Ok(current) => current.unwrap_or(request),
            Err(e) => return Err(fail_request(&state, request_id, e, duration_ms).await),
        };
        if current.is_terminal() {
            tracing::info!(status = %current.status, "Request finished elsewhere, skipping delivery");
            return Ok(TaskOutcome::AlreadyTerminal {
                status: current.status,
            });
        }

        let report_delivered = match deliver_report(state.mailer.as_ref(), &current, &result).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Report delivery failed, result remains stored");
                state.observability.capture_error(request_id, "report_delivery", &e);
                false
            }
        };

        match current.mark_completed(Utc::now(), result.request_id) {
            Ok(()) => {}
            Err(AppError::InvalidTransition { from, .. }) => {
                return Ok(TaskOutcome::AlreadyTerminal { status: from });
            }
            Err(e) => return Err(e),
        }
        state.repository.update(&current).await?;

        tracing::info!(
            duration_ms = duration_ms,
            status = %current.status,
            report_delivered = report_delivered,
            "Evaluation request completed"
        );
        Ok(TaskOutcome::Completed { report_delivered })
    }
}

async fn call_ai(state: &AppState, request: &EvaluationRequest) -> Result<ProcessingResult, AppError> {
    let ai_request = AiProcessingRequest::for_request(request, state.config.storage_bucket_name());
    let timeout = state.config.ai_timeout();
    match tokio::time::timeout(timeout, state.ai_client.process(&ai_request)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(timeout_error(timeout)),
    }
}

/// Best-effort move to `failed`; always hands the original error back.
///
/// A request whose `processing` write never landed is still `pending` and
/// passes through `processing` on the way.
async fn fail_request(
    state: &AppState,
    request_id: Uuid,
    error: AppError,
    duration_ms: u64,
) -> AppError {
    tracing::error!(
        error = %error,
        error_type = error.error_type(),
        duration_ms = duration_ms,
        "Evaluation processing failed"
    );
    state.observability.capture_error(request_id, "processing", &error);

    match state.repository.get(request_id).await {
        Ok(Some(mut current)) => match mark_failed(&mut current, &error) {
            Ok(()) => {
                if let Err(e) = state.repository.update(&current).await {
                    tracing::error!(error = %e, "Failed to persist failed status");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Request already terminal, status left unchanged");
            }
        },
        Ok(None) => tracing::warn!("Request disappeared during processing"),
        Err(e) => tracing::error!(error = %e, "Failed to fetch request to mark it failed"),
    }

    error
}

fn mark_failed(request: &mut EvaluationRequest, error: &AppError) -> Result<(), AppError> {
    let now = Utc::now();
    if request.status == RequestStatus::Pending {
        request.mark_processing(now)?;
    }
    request.mark_failed(now, error.client_message())
}
