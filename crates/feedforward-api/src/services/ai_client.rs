//! Client for the external AI evaluation service.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use feedforward_core::models::{EvaluationRequest, ProcessingResult, ResultStatus};
use feedforward_core::{AppError, Config};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiFilePath {
    pub bucket: String,
    pub path: String,
    pub filename: String,
}

/// Body of `POST {AI_PROCESSING_URL}/process`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiProcessingRequest {
    pub submission_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_paths: Vec<AiFilePath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_provided_audience: Option<String>,
    pub bucket_name: String,
}

impl AiProcessingRequest {
    pub fn for_request(request: &EvaluationRequest, bucket_name: &str) -> Self {
        Self {
            submission_id: request.id,
            url: request.url.clone(),
            file_paths: request
                .files
                .iter()
                .map(|file| AiFilePath {
                    bucket: bucket_name.to_string(),
                    path: file.storage_path.clone(),
                    filename: file.filename.clone(),
                })
                .collect(),
            user_provided_audience: request.audience.clone(),
            bucket_name: bucket_name.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AiProcessingResponse {
    #[serde(default)]
    audiences: Vec<serde_json::Value>,
    #[serde(default)]
    assessments: serde_json::Value,
    #[serde(default)]
    report: Option<serde_json::Value>,
    #[serde(default)]
    validated_citations: Vec<serde_json::Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    pdf_content: Option<String>,
}

impl AiProcessingResponse {
    /// A reported `failed` status is an upstream failure even on HTTP 200.
    fn into_result(self, request_id: Uuid) -> Result<ProcessingResult, AppError> {
        if self.status.as_deref() == Some("failed") {
            return Err(AppError::UpstreamFailure(
                self.error
                    .unwrap_or_else(|| "AI processing failed".to_string()),
            ));
        }
        Ok(ProcessingResult {
            request_id,
            audiences: self.audiences,
            assessments: self.assessments,
            report: self.report,
            validated_citations: self.validated_citations,
            status: ResultStatus::Completed,
            error: self.error,
            pdf_content: self.pdf_content,
            created_at: Utc::now(),
        })
    }
}

#[async_trait]
pub trait AiClient: Send + Sync {
    async fn process(&self, request: &AiProcessingRequest) -> Result<ProcessingResult, AppError>;
}

#[derive(Clone)]
pub struct HttpAiClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpAiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build AI client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: format!("{}/process", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Self::new(config.ai_processing_url(), config.ai_timeout())
    }

    fn timeout_error(&self) -> AppError {
        timeout_error(self.timeout)
    }
}

/// `UpstreamTimeout` worded with the configured bound, e.g. "after 10 minutes".
pub fn timeout_error(timeout: Duration) -> AppError {
    let secs = timeout.as_secs();
    let (amount, unit) = if secs > 0 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    let plural = if amount == 1 { "" } else { "s" };
    AppError::UpstreamTimeout(format!(
        "AI processing timed out after {} {}{}",
        amount, unit, plural
    ))
}

#[async_trait]
impl AiClient for HttpAiClient {
    #[tracing::instrument(skip_all, fields(request_id = %request.submission_id))]
    async fn process(&self, request: &AiProcessingRequest) -> Result<ProcessingResult, AppError> {
        tracing::info!(
            endpoint = %self.endpoint,
            has_url = request.url.is_some(),
            file_count = request.file_paths.len(),
            "Calling AI processing service"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    self.timeout_error()
                } else {
                    AppError::UpstreamFailure(format!("AI service request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamFailure(format!(
                "AI service returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body: AiProcessingResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.timeout_error()
            } else {
                AppError::UpstreamFailure(format!("Invalid AI service response: {}", e))
            }
        })?;

        let result = body.into_result(request.submission_id)?;
        tracing::info!(
            audience_count = result.audiences.len(),
            has_report = result.report.is_some(),
            "AI processing completed"
        );
        Ok(result)
    }
}
