use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use feedforward_core::models::{EvaluationStatusResponse, SubmissionResponse};
use feedforward_core::AppError;

use crate::error::{rate_limit_headers, ErrorResponse, HttpAppError};
use crate::services::submission;
use crate::state::AppState;
use crate::utils::ip_extraction::ClientIp;
use crate::utils::upload::read_submission_form;

#[utoipa::path(
    post,
    path = "/api/v1/evaluations",
    tag = "evaluations",
    request_body(content = inline(Object), content_type = "multipart/form-data",
        description = "Fields: email (required), url, audience, files (repeated; PDF, PPTX or DOCX)"),
    responses(
        (status = 201, description = "Submission accepted", body = SubmissionResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 413, description = "A file exceeds the size limit", body = ErrorResponse),
        (status = 429, description = "Rate limit exceeded", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn create_evaluation(
    State(state): State<Arc<AppState>>,
    ClientIp(client_ip): ClientIp,
    multipart: Multipart,
) -> Result<Response, HttpAppError> {
    let upload = read_submission_form(multipart).await?;
    let accepted = submission::submit(&state, upload, &client_ip).await?;

    let headers = accepted
        .limits
        .map(|(email, ip)| rate_limit_headers(&email, &ip))
        .unwrap_or_else(HeaderMap::new);
    Ok((StatusCode::CREATED, headers, Json(accepted.response)).into_response())
}

#[utoipa::path(
    get,
    path = "/api/v1/evaluations/{id}",
    tag = "evaluations",
    params(("id" = String, Path, description = "Evaluation request id")),
    responses(
        (status = 200, description = "Current status, with the result once completed", body = EvaluationStatusResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Unknown id", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_evaluation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<EvaluationStatusResponse>, HttpAppError> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::BadRequest(format!("Invalid evaluation id: {}", id)))?;

    let request = state
        .repository
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Evaluation request {} not found", id)))?;

    let result = if request.result_id.is_some() {
        state.repository.get_result(id).await?
    } else {
        None
    };

    Ok(Json(EvaluationStatusResponse::build(
        request,
        result,
        state.config.estimated_completion(),
    )))
}
