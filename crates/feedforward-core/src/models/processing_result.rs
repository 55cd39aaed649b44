use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{EvaluationRequest, FileReference, RequestStatus};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Completed,
    Failed,
}

/// Output of the AI service for one request, stored next to the request under the same id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessingResult {
    pub request_id: Uuid,
    pub audiences: Vec<serde_json::Value>,
    pub assessments: serde_json::Value,
    pub report: Option<serde_json::Value>,
    pub validated_citations: Vec<serde_json::Value>,
    pub status: ResultStatus,
    pub error: Option<String>,
    /// Base64-encoded PDF deliverable, when the service rendered one
    pub pdf_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProcessingResult {
    /// Rendered report bytes, preferring the top-level field over the one nested in `report`.
    pub fn report_pdf_base64(&self) -> Option<&str> {
        self.pdf_content
            .as_deref()
            .or_else(|| {
                self.report
                    .as_ref()
                    .and_then(|r| r.get("pdf_content"))
                    .and_then(|v| v.as_str())
            })
            .filter(|s| !s.trim().is_empty())
    }
}

/// Result fields exposed by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EvaluationResultView {
    #[schema(value_type = Vec<Object>)]
    pub audiences: Vec<serde_json::Value>,
    #[schema(value_type = Object)]
    pub assessments: serde_json::Value,
    #[schema(value_type = Option<Object>)]
    pub report: Option<serde_json::Value>,
    #[schema(value_type = Vec<Object>)]
    pub validated_citations: Vec<serde_json::Value>,
}

impl From<ProcessingResult> for EvaluationResultView {
    fn from(result: ProcessingResult) -> Self {
        // The embedded deliverable is for email delivery, not for polling clients
        let report = result.report.map(|mut report| {
            if let Some(obj) = report.as_object_mut() {
                obj.remove("pdf_content");
            }
            report
        });
        Self {
            audiences: result.audiences,
            assessments: result.assessments,
            report,
            validated_citations: result.validated_citations,
        }
    }
}

/// Response of the create-submission endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubmissionResponse {
    pub id: Uuid,
    pub status: RequestStatus,
    pub submitted_at: DateTime<Utc>,
    pub estimated_completion_time: DateTime<Utc>,
    pub message: String,
}

/// Response of the status query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EvaluationStatusResponse {
    pub id: Uuid,
    pub status: RequestStatus,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    pub files: Vec<FileReference>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<EvaluationResultView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion_time: Option<DateTime<Utc>>,
}

impl EvaluationStatusResponse {
    /// `result` is attached only once the request completed; the estimate only while it is in flight.
    pub fn build(
        request: EvaluationRequest,
        result: Option<ProcessingResult>,
        completion_offset: chrono::Duration,
    ) -> Self {
        let estimated_completion_time =
            (!request.is_terminal()).then(|| request.estimated_completion(completion_offset));
        let result = result
            .filter(|_| request.status == RequestStatus::Completed)
            .map(EvaluationResultView::from);

        Self {
            id: request.id,
            status: request.status,
            email: request.email,
            url: request.url,
            audience: request.audience,
            files: request.files,
            submitted_at: request.submitted_at,
            processing_started_at: request.processing_started_at,
            completed_at: request.completed_at,
            error_message: request.error_message,
            result,
            estimated_completion_time,
        }
    }
}
