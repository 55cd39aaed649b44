//! Multipart parsing for the create-submission endpoint.

use axum::extract::Multipart;
use feedforward_core::AppError;

use crate::services::{SubmissionUpload, UploadedFile};

/// Read every known field of the submission form.
///
/// Limits are not enforced here; validation reports size and count problems
/// for all files at once. Unknown fields are ignored.
pub async fn read_submission_form(mut multipart: Multipart) -> Result<SubmissionUpload, AppError> {
    let mut upload = SubmissionUpload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" | "files[]" | "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?;
                upload.files.push(UploadedFile {
                    filename,
                    content_type,
                    data,
                });
            }
            "email" | "url" | "audience" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read field {}: {}", name, e)))?;
                let slot = match name.as_str() {
                    "email" => &mut upload.email,
                    "url" => &mut upload.url,
                    _ => &mut upload.audience,
                };
                *slot = Some(text);
            }
            other => {
                tracing::debug!(field = %other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(upload)
}
