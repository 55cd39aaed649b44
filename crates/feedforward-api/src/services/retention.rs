//! Periodic removal of stored files, requests and results past their retention age.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::time::interval;

use feedforward_core::models::EvaluationRequest;
use feedforward_core::{AppError, Config};
use feedforward_db::EvaluationRepository;
use feedforward_storage::Storage;

const RETENTION_INTERVAL: StdDuration = StdDuration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub upload_days: i64,
    pub request_days: i64,
    pub result_days: i64,
}

impl RetentionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            upload_days: config.upload_retention_days(),
            request_days: config.request_retention_days(),
            result_days: config.result_retention_days(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionReport {
    pub files_deleted: usize,
    pub requests_deleted: usize,
    pub results_deleted: usize,
}

#[derive(Clone)]
pub struct RetentionService {
    repository: Arc<dyn EvaluationRepository>,
    storage: Arc<dyn Storage>,
    policy: RetentionPolicy,
}

impl RetentionService {
    pub fn new(
        repository: Arc<dyn EvaluationRepository>,
        storage: Arc<dyn Storage>,
        policy: RetentionPolicy,
    ) -> Self {
        Self {
            repository,
            storage,
            policy,
        }
    }

    /// Start the hourly retention job.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(RETENTION_INTERVAL);
            loop {
                ticker.tick().await;
                tracing::info!("Starting scheduled retention run");
                let report = self.run_once(Utc::now()).await;
                tracing::info!(
                    files_deleted = report.files_deleted,
                    requests_deleted = report.requests_deleted,
                    results_deleted = report.results_deleted,
                    "Retention run completed"
                );
            }
        })
    }

    /// One pass over every retention rule. Each rule logs its own failures.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self, now: DateTime<Utc>) -> RetentionReport {
        let files_deleted = self
            .expire_uploads(now - Duration::days(self.policy.upload_days))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to expire uploaded files");
                0
            });
        let requests_deleted = self
            .expire_requests(now - Duration::days(self.policy.request_days))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to expire evaluation requests");
                0
            });
        let results_deleted = self
            .expire_results(now - Duration::days(self.policy.result_days))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to expire processing results");
                0
            });

        RetentionReport {
            files_deleted,
            requests_deleted,
            results_deleted,
        }
    }

    /// Deletes the stored objects and clears the file list of each request.
    async fn expire_uploads(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError> {
        let mut deleted = 0;
        for mut request in self.repository.find_submitted_before(cutoff).await? {
            if request.files.is_empty() {
                continue;
            }
            deleted += self.delete_files(&request).await;
            request.files.clear();
            if let Err(e) = self.repository.update(&request).await {
                tracing::warn!(request_id = %request.id, error = %e, "Failed to clear file references");
            }
        }
        Ok(deleted)
    }

    /// Only terminal requests are removed; in-flight ones are left to finish.
    async fn expire_requests(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError> {
        let mut deleted = 0;
        for request in self.repository.find_submitted_before(cutoff).await? {
            if !request.is_terminal() {
                continue;
            }
            self.delete_files(&request).await;
            match self.repository.delete(request.id).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(request_id = %request.id, error = %e, "Failed to delete expired request");
                }
            }
        }
        Ok(deleted)
    }

    async fn expire_results(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError> {
        let mut deleted = 0;
        for request in self.repository.find_completed_before(cutoff).await? {
            if self.repository.delete_result(request.id).await? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    async fn delete_files(&self, request: &EvaluationRequest) -> usize {
        let mut deleted = 0;
        for file in &request.files {
            match self.storage.delete(&file.storage_path).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    tracing::warn!(
                        request_id = %request.id,
                        storage_key = %file.storage_path,
                        error = %e,
                        "Failed to delete stored file"
                    );
                }
            }
        }
        deleted
    }
}
