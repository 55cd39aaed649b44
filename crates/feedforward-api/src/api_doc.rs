//! OpenAPI documentation served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use crate::services::ObservabilitySnapshot;
use crate::setup::routes::HealthCheckResponse;
use feedforward_core::models;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Feedforward API",
        version = "0.1.0",
        description = "Submission intake and status API for AI-generated storytelling evaluations. Submit a URL or documents, then poll for the result or wait for the emailed report. All endpoints are versioned under /api/v1/."
    ),
    paths(
        handlers::evaluations::create_evaluation,
        handlers::evaluations::get_evaluation,
        handlers::tasks::process_task,
        handlers::metrics::get_metrics,
        handlers::data_deletion::delete_user_data,
        crate::setup::routes::health::health_check,
    ),
    components(schemas(
        error::ErrorResponse,
        models::SubmissionResponse,
        models::EvaluationStatusResponse,
        models::EvaluationResultView,
        models::RequestStatus,
        models::FileReference,
        models::FileKind,
        models::TaskPayload,
        models::TaskOutcome,
        handlers::tasks::TaskProcessResponse,
        handlers::data_deletion::DataDeletionRequest,
        handlers::data_deletion::DataDeletionResponse,
        ObservabilitySnapshot,
        HealthCheckResponse,
        feedforward_core::FieldError,
        feedforward_core::RateLimitRejection,
        feedforward_core::LimitSnapshot,
    )),
    tags(
        (name = "evaluations", description = "Submit evaluation requests and query their status"),
        (name = "tasks", description = "Internal task trigger for the processing pipeline"),
        (name = "metrics", description = "In-process processing metrics, errors and alerts"),
        (name = "privacy", description = "Erasure of a user's data"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;
