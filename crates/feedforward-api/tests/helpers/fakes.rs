//! In-memory stand-ins for the AI service, mail transport, task dispatcher,
//! admission control and a repository that fails on request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use feedforward_api::services::{AiClient, AiProcessingRequest, Mailer, OutgoingEmail};
use feedforward_core::models::{EvaluationRequest, ProcessingResult, ResultStatus, TaskPayload};
use feedforward_core::AppError;
use feedforward_db::{EvaluationRepository, InMemoryEvaluationRepository};
use feedforward_infra::{AdmissionControl, AdmissionDecision, RateLimitError};
use feedforward_worker::{DispatchError, TaskDispatcher};

use super::fixtures;

/// What the next AI call does.
#[derive(Debug, Clone)]
pub enum AiBehavior {
    /// Return a result, with a rendered PDF when `pdf` is set
    Succeed { pdf: bool },
    Timeout,
    /// Never answers; only the handler's own deadline ends the call
    Hang,
    Fail(String),
}

pub struct ScriptedAiClient {
    behavior: Mutex<AiBehavior>,
    calls: AtomicUsize,
}

impl Default for ScriptedAiClient {
    fn default() -> Self {
        Self {
            behavior: Mutex::new(AiBehavior::Succeed { pdf: true }),
            calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedAiClient {
    pub fn set(&self, behavior: AiBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiClient for ScriptedAiClient {
    async fn process(&self, request: &AiProcessingRequest) -> Result<ProcessingResult, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            AiBehavior::Succeed { pdf } => Ok(ProcessingResult {
                request_id: request.submission_id,
                audiences: vec![serde_json::json!({"name": "Investors"})],
                assessments: serde_json::json!({"clarity": 4}),
                report: Some(serde_json::json!({"summary": "Strong opening"})),
                validated_citations: vec![],
                status: ResultStatus::Completed,
                error: None,
                pdf_content: pdf.then(fixtures::pdf_base64),
                created_at: Utc::now(),
            }),
            AiBehavior::Timeout => Err(AppError::UpstreamTimeout(
                "AI processing timed out after 10 minutes".to_string(),
            )),
            AiBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(AppError::Internal("AI call outlived its deadline".to_string()))
            }
            AiBehavior::Fail(message) => Err(AppError::UpstreamFailure(message)),
        }
    }
}

/// Keeps every sent email; can be told to fail sends.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail_subject: Mutex<Option<String>>,
}

impl RecordingMailer {
    /// Fail every email whose subject equals `subject`.
    pub fn fail_on_subject(&self, subject: &str) {
        *self.fail_subject.lock().unwrap() = Some(subject.to_string());
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_with_subject(&self, subject: &str) -> Vec<OutgoingEmail> {
        self.sent()
            .into_iter()
            .filter(|email| email.subject == subject)
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), AppError> {
        if self.fail_subject.lock().unwrap().as_deref() == Some(email.subject.as_str()) {
            return Err(AppError::DeliveryFailure("SMTP connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

/// Records tasks instead of running them; tests drive the task endpoint themselves.
#[derive(Default)]
pub struct RecordingDispatcher {
    tasks: Mutex<Vec<TaskPayload>>,
}

impl RecordingDispatcher {
    pub fn tasks(&self) -> Vec<TaskPayload> {
        self.tasks.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskDispatcher for RecordingDispatcher {
    async fn enqueue(&self, payload: TaskPayload) -> Result<(), DispatchError> {
        self.tasks.lock().unwrap().push(payload);
        Ok(())
    }

    fn kind(&self) -> &'static str {
        "recording"
    }
}

/// Repository operations that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoOp {
    Get,
    Update,
    SaveResult,
}

/// In-memory repository that fails selected calls.
#[derive(Default)]
pub struct FaultyRepository {
    inner: InMemoryEvaluationRepository,
    faults: Mutex<Vec<(RepoOp, usize)>>,
}

impl FaultyRepository {
    /// Fail the `nth` (1-based) upcoming call of `op`.
    pub fn fail_call(&self, op: RepoOp, nth: usize) {
        self.faults.lock().unwrap().push((op, nth));
    }

    fn check(&self, op: RepoOp) -> Result<(), AppError> {
        let mut faults = self.faults.lock().unwrap();
        let mut hit = false;
        faults.retain_mut(|(fault_op, remaining)| {
            if *fault_op != op {
                return true;
            }
            *remaining -= 1;
            if *remaining == 0 {
                hit = true;
                return false;
            }
            true
        });
        if hit {
            return Err(AppError::Internal(format!("{:?} failed: connection reset", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl EvaluationRepository for FaultyRepository {
    async fn create(&self, request: &EvaluationRequest) -> Result<(), AppError> {
        self.inner.create(request).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<EvaluationRequest>, AppError> {
        self.check(RepoOp::Get)?;
        self.inner.get(id).await
    }

    async fn update(&self, request: &EvaluationRequest) -> Result<(), AppError> {
        self.check(RepoOp::Update)?;
        self.inner.update(request).await
    }

    async fn save_result(&self, result: &ProcessingResult) -> Result<(), AppError> {
        self.check(RepoOp::SaveResult)?;
        self.inner.save_result(result).await
    }

    async fn get_result(&self, request_id: Uuid) -> Result<Option<ProcessingResult>, AppError> {
        self.inner.get_result(request_id).await
    }

    async fn delete_result(&self, request_id: Uuid) -> Result<bool, AppError> {
        self.inner.delete_result(request_id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Vec<EvaluationRequest>, AppError> {
        self.inner.find_by_email(email).await
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        self.inner.delete(id).await
    }

    async fn find_submitted_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<EvaluationRequest>, AppError> {
        self.inner.find_submitted_before(cutoff).await
    }

    async fn find_completed_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<EvaluationRequest>, AppError> {
        self.inner.find_completed_before(cutoff).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.inner.ping().await
    }
}

/// Admission control whose backing store is broken.
pub struct FailingAdmission;

impl AdmissionControl for FailingAdmission {
    fn check(&self, _email: &str, _ip: &str) -> Result<AdmissionDecision, RateLimitError> {
        Err(RateLimitError::Poisoned)
    }
}
