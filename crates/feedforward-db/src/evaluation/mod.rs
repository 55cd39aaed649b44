//! Evaluation request repository

mod memory;
mod postgres;

pub use memory::InMemoryEvaluationRepository;
pub use postgres::PgEvaluationRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedforward_core::models::{EvaluationRequest, ProcessingResult};
use feedforward_core::AppError;
use uuid::Uuid;

/// Storage of evaluation requests and their sibling processing results.
///
/// Writes replace the whole record; the request state machine is enforced by
/// callers before `update` is invoked.
#[async_trait]
pub trait EvaluationRepository: Send + Sync {
    async fn create(&self, request: &EvaluationRequest) -> Result<(), AppError>;

    async fn get(&self, id: Uuid) -> Result<Option<EvaluationRequest>, AppError>;

    /// Persist the current state of an existing request. `NotFound` if it was deleted.
    async fn update(&self, request: &EvaluationRequest) -> Result<(), AppError>;

    /// Insert or replace the result stored under `result.request_id`.
    async fn save_result(&self, result: &ProcessingResult) -> Result<(), AppError>;

    async fn get_result(&self, request_id: Uuid) -> Result<Option<ProcessingResult>, AppError>;

    async fn delete_result(&self, request_id: Uuid) -> Result<bool, AppError>;

    /// All requests for a normalized email, newest first.
    async fn find_by_email(&self, email: &str) -> Result<Vec<EvaluationRequest>, AppError>;

    /// Delete a request together with its result.
    async fn delete(&self, id: Uuid) -> Result<bool, AppError>;

    async fn find_submitted_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<EvaluationRequest>, AppError>;

    async fn find_completed_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<EvaluationRequest>, AppError>;

    /// Cheap connectivity check for health endpoints.
    async fn ping(&self) -> Result<(), AppError>;
}
