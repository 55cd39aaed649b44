//! Application state shared by handlers, the task queue and background jobs.

use std::sync::Arc;

use feedforward_core::Config;
use feedforward_db::EvaluationRepository;
use feedforward_infra::AdmissionControl;
use feedforward_storage::Storage;
use feedforward_worker::TaskDispatcher;

use crate::services::{AiClient, Mailer, PipelineObservability};

pub struct AppState {
    pub config: Config,
    pub repository: Arc<dyn EvaluationRepository>,
    pub storage: Arc<dyn Storage>,
    pub admission: Arc<dyn AdmissionControl>,
    pub observability: PipelineObservability,
    pub ai_client: Arc<dyn AiClient>,
    pub mailer: Arc<dyn Mailer>,
    pub dispatcher: Arc<dyn TaskDispatcher>,
}
