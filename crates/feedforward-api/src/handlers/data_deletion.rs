use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use feedforward_core::validation::validate_email;
use feedforward_core::AppError;

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DataDeletionRequest {
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DataDeletionResponse {
    pub deleted_count: usize,
    /// Per-item failures; the remaining items were still deleted
    pub errors: Vec<String>,
}

/// Erase every request, stored file and result for one email address.
#[utoipa::path(
    post,
    path = "/api/v1/data-deletion",
    tag = "privacy",
    request_body = DataDeletionRequest,
    responses(
        (status = 200, description = "Deletion finished", body = DataDeletionResponse),
        (status = 400, description = "Malformed email", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user_data(
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<DataDeletionRequest>,
) -> Result<Json<DataDeletionResponse>, HttpAppError> {
    let email = validate_email(Some(&body.email))
        .map_err(|e| AppError::from_field_errors(vec![e]))?;

    let requests = state.repository.find_by_email(&email).await?;
    let mut deleted_count = 0;
    let mut errors = Vec::new();

    for request in requests {
        for file in &request.files {
            if let Err(e) = state.storage.delete(&file.storage_path).await {
                tracing::warn!(request_id = %request.id, storage_key = %file.storage_path, error = %e, "Failed to delete stored file");
                errors.push(format!("Failed to delete file {} of {}: {}", file.filename, request.id, e));
            }
        }
        match state.repository.delete(request.id).await {
            Ok(true) => deleted_count += 1,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(request_id = %request.id, error = %e, "Failed to delete evaluation request");
                errors.push(format!("Failed to delete request {}: {}", request.id, e));
            }
        }
    }

    tracing::info!(deleted_count = deleted_count, error_count = errors.len(), "User data deleted");
    Ok(Json(DataDeletionResponse {
        deleted_count,
        errors,
    }))
}
