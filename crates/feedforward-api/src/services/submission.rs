//! Submission intake: validate, admit, store files, persist, enqueue, acknowledge.

use bytes::Bytes;
use chrono::Utc;

use feedforward_core::models::{
    EvaluationRequest, FileReference, NewEvaluationRequest, SubmissionResponse, TaskPayload,
};
use feedforward_core::validation::{validate_submission, FileCandidate, SubmissionInput, ValidationLimits};
use feedforward_core::{AppError, LimitSnapshot};
use feedforward_storage::submission_file_key;

use super::email::confirmation_email;
use crate::state::AppState;

/// One file as read from the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Raw fields of a create-submission call.
#[derive(Debug, Clone, Default)]
pub struct SubmissionUpload {
    pub email: Option<String>,
    pub url: Option<String>,
    pub audience: Option<String>,
    pub files: Vec<UploadedFile>,
}

impl SubmissionUpload {
    fn validation_input(&self) -> SubmissionInput {
        SubmissionInput {
            email: self.email.clone(),
            url: self.url.clone(),
            audience: self.audience.clone(),
            files: self
                .files
                .iter()
                .map(|f| FileCandidate {
                    filename: f.filename.clone(),
                    content_type: f.content_type.clone(),
                    size_bytes: f.data.len() as u64,
                })
                .collect(),
        }
    }
}

/// Accepted submission plus the admission counters to report in headers.
#[derive(Debug, Clone)]
pub struct AcceptedSubmission {
    pub response: SubmissionResponse,
    /// `None` when the admission check itself failed and the request was let through
    pub limits: Option<(LimitSnapshot, LimitSnapshot)>,
}

pub fn acknowledgement_message(estimated_minutes: i64) -> String {
    format!(
        "Your evaluation request has been received. You will receive a report via email within {} minutes.",
        estimated_minutes
    )
}

/// Run the whole intake for one submission.
///
/// Nothing is stored before validation and admission pass. A failure after
/// some files were uploaded leaves those objects orphaned; retention removes them.
#[tracing::instrument(skip_all, fields(client_ip = %client_ip, request_id = tracing::field::Empty))]
pub async fn submit(
    state: &AppState,
    upload: SubmissionUpload,
    client_ip: &str,
) -> Result<AcceptedSubmission, AppError> {
    let limits = ValidationLimits {
        max_file_size_bytes: state.config.max_file_size_bytes(),
        max_files: state.config.max_files_per_submission(),
    };
    let validated = validate_submission(&upload.validation_input(), &limits)?;

    let limits = match state.admission.check(&validated.email, client_ip) {
        Ok(decision) => {
            if let Some(rejection) = decision.rejection() {
                tracing::warn!(
                    reason = ?rejection.reason,
                    email_remaining = rejection.email_limit.remaining,
                    ip_remaining = rejection.ip_limit.remaining,
                    "Submission rejected by rate limit"
                );
                return Err(AppError::RateLimited(Box::new(rejection)));
            }
            Some((decision.email.snapshot(), decision.ip.snapshot()))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rate limit check failed, allowing submission");
            None
        }
    };

    let mut files = Vec::with_capacity(validated.files.len());
    for file in &validated.files {
        let data = upload
            .files
            .get(file.index)
            .map(|f| f.data.clone())
            .ok_or_else(|| AppError::Internal(format!("Missing upload at index {}", file.index)))?;
        let key = submission_file_key(file.kind);
        state
            .storage
            .upload_with_key(&key, data, file.kind.content_type())
            .await?;
        tracing::debug!(storage_key = %key, size_bytes = file.size_bytes, "Stored submission file");
        files.push(FileReference {
            filename: file.filename.clone(),
            storage_path: key,
            kind: file.kind,
            size_bytes: file.size_bytes,
            uploaded_at: Utc::now(),
        });
    }

    let request = EvaluationRequest::new(
        NewEvaluationRequest {
            email: validated.email,
            url: validated.url,
            files,
            audience: validated.audience,
        },
        Utc::now(),
    )?;
    tracing::Span::current().record("request_id", request.id.to_string());

    state.repository.create(&request).await?;
    state
        .dispatcher
        .enqueue(TaskPayload {
            request_id: request.id,
        })
        .await?;

    let minutes = state.config.estimated_completion_minutes();
    let mailer = state.mailer.clone();
    let email = confirmation_email(&request.email, request.id, minutes);
    let request_id = request.id;
    tokio::spawn(async move {
        if let Err(e) = mailer.send(email).await {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to send confirmation email");
        }
    });

    tracing::info!(
        request_id = %request.id,
        has_url = request.url.is_some(),
        file_count = request.files.len(),
        "Evaluation request accepted"
    );

    Ok(AcceptedSubmission {
        response: SubmissionResponse {
            id: request.id,
            status: request.status,
            submitted_at: request.submitted_at,
            estimated_completion_time: request.estimated_completion(state.config.estimated_completion()),
            message: acknowledgement_message(minutes),
        },
        limits,
    })
}
