use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedforward_core::models::{EvaluationRequest, ProcessingResult};
use feedforward_core::AppError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::EvaluationRepository;

#[derive(Default)]
struct Tables {
    requests: HashMap<Uuid, EvaluationRequest>,
    results: HashMap<Uuid, ProcessingResult>,
}

/// Process-local repository used when no `DATABASE_URL` is configured and in tests.
#[derive(Clone, Default)]
pub struct InMemoryEvaluationRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryEvaluationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EvaluationRepository for InMemoryEvaluationRepository {
    async fn create(&self, request: &EvaluationRequest) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if tables.requests.contains_key(&request.id) {
            return Err(AppError::Internal(format!(
                "Evaluation request {} already exists",
                request.id
            )));
        }
        tables.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<EvaluationRequest>, AppError> {
        Ok(self.tables.read().await.requests.get(&id).cloned())
    }

    async fn update(&self, request: &EvaluationRequest) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        match tables.requests.get_mut(&request.id) {
            Some(existing) => {
                *existing = request.clone();
                Ok(())
            }
            None => Err(AppError::NotFound(format!(
                "Evaluation request {} not found",
                request.id
            ))),
        }
    }

    async fn save_result(&self, result: &ProcessingResult) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        if !tables.requests.contains_key(&result.request_id) {
            return Err(AppError::NotFound(format!(
                "Evaluation request {} not found",
                result.request_id
            )));
        }
        tables.results.insert(result.request_id, result.clone());
        Ok(())
    }

    async fn get_result(&self, request_id: Uuid) -> Result<Option<ProcessingResult>, AppError> {
        Ok(self.tables.read().await.results.get(&request_id).cloned())
    }

    async fn delete_result(&self, request_id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .tables
            .write()
            .await
            .results
            .remove(&request_id)
            .is_some())
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<EvaluationRequest>, AppError> {
        let tables = self.tables.read().await;
        let mut found: Vec<EvaluationRequest> = tables
            .requests
            .values()
            .filter(|r| r.email == email)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(found)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        tables.results.remove(&id);
        Ok(tables.requests.remove(&id).is_some())
    }

    async fn find_submitted_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<EvaluationRequest>, AppError> {
        let tables = self.tables.read().await;
        let mut found: Vec<EvaluationRequest> = tables
            .requests
            .values()
            .filter(|r| r.submitted_at < cutoff)
            .cloned()
            .collect();
        found.sort_by_key(|r| r.submitted_at);
        Ok(found)
    }

    async fn find_completed_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<EvaluationRequest>, AppError> {
        let tables = self.tables.read().await;
        let mut found: Vec<EvaluationRequest> = tables
            .requests
            .values()
            .filter(|r| r.completed_at.is_some_and(|at| at < cutoff))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.submitted_at);
        Ok(found)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
