//! Service wiring and application state construction

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use feedforward_core::{Config, TaskDispatchMode};
use feedforward_db::EvaluationRepository;
use feedforward_infra::{AdmissionControl, AdmissionController};
use feedforward_storage::Storage;
use feedforward_worker::{
    HttpTaskDispatcher, LocalTaskQueue, TaskDispatcher, TaskHandlerContext, TaskQueueConfig,
    TaskReceiver,
};

use crate::services::{
    create_mailer, AiClient, HttpAiClient, Mailer, PipelineObservability, RetentionPolicy,
    RetentionService,
};
use crate::state::AppState;

const RATE_LIMIT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);
/// Extra time a queued task gets beyond the AI timeout for storage and delivery
const TASK_TIMEOUT_MARGIN: Duration = Duration::from_secs(300);

/// Collaborators that can be swapped out, e.g. by tests.
pub struct AppComponents {
    pub repository: Arc<dyn EvaluationRepository>,
    pub storage: Arc<dyn Storage>,
    pub ai_client: Arc<dyn AiClient>,
    pub mailer: Arc<dyn Mailer>,
    /// Built from config when `None`
    pub dispatcher: Option<Arc<dyn TaskDispatcher>>,
    /// Per-email and per-IP limits from config when `None`
    pub admission: Option<Arc<dyn AdmissionControl>>,
}

impl AppComponents {
    /// Production collaborators built from config.
    pub fn from_config(
        config: &Config,
        repository: Arc<dyn EvaluationRepository>,
        storage: Arc<dyn Storage>,
    ) -> Result<Self> {
        let ai_client = HttpAiClient::from_config(config).context("Failed to build AI client")?;
        tracing::info!(url = %config.ai_processing_url(), "AI processing client configured");
        Ok(Self {
            repository,
            storage,
            ai_client: Arc::new(ai_client),
            mailer: create_mailer(config),
            dispatcher: None,
            admission: None,
        })
    }
}

enum Dispatch {
    Ready(Arc<dyn TaskDispatcher>),
    Local(LocalTaskQueue, TaskReceiver),
}

fn build_dispatch(config: &Config) -> Result<Dispatch> {
    match config.task_dispatch_mode() {
        TaskDispatchMode::Local => {
            let queue_config = TaskQueueConfig {
                max_workers: config.task_max_workers(),
                max_retries: config.task_max_retries(),
                task_timeout: config.ai_timeout() + TASK_TIMEOUT_MARGIN,
                ..TaskQueueConfig::default()
            };
            let (queue, receiver) = LocalTaskQueue::new(queue_config);
            Ok(Dispatch::Local(queue, receiver))
        }
        TaskDispatchMode::Http => {
            let url = config
                .task_handler_url()
                .context("TASK_HANDLER_URL is required for http dispatch")?;
            let dispatcher = HttpTaskDispatcher::new(url).context("Failed to build task dispatcher")?;
            tracing::info!(target_url = %url, "Tasks are dispatched over HTTP");
            Ok(Dispatch::Ready(Arc::new(dispatcher)))
        }
    }
}

/// Assemble the application state and start the local worker pool if one is used.
pub fn build_state(config: &Config, components: AppComponents) -> Result<Arc<AppState>> {
    let admission = match components.admission {
        Some(admission) => admission,
        None => {
            let controller = Arc::new(AdmissionController::from_config(config));
            controller.clone().spawn_cleanup(RATE_LIMIT_SWEEP_INTERVAL);
            controller as Arc<dyn AdmissionControl>
        }
    };
    let observability = PipelineObservability::from_config(config, components.mailer.clone());

    let (dispatcher, local): (Arc<dyn TaskDispatcher>, _) = match components.dispatcher {
        Some(dispatcher) => (dispatcher, None),
        None => match build_dispatch(config)? {
            Dispatch::Ready(dispatcher) => (dispatcher, None),
            Dispatch::Local(queue, receiver) => (Arc::new(queue.clone()), Some((queue, receiver))),
        },
    };

    let state = Arc::new(AppState {
        config: config.clone(),
        repository: components.repository,
        storage: components.storage,
        admission,
        observability,
        ai_client: components.ai_client,
        mailer: components.mailer,
        dispatcher,
    });

    if let Some((queue, receiver)) = local {
        let context: Arc<dyn TaskHandlerContext> = state.clone();
        queue.start(receiver, Arc::downgrade(&context));
        tracing::info!(
            max_workers = config.task_max_workers(),
            max_retries = config.task_max_retries(),
            "Local task queue started"
        );
    }

    Ok(state)
}

/// Start the hourly data retention job when enabled.
pub fn start_background_jobs(config: &Config, state: &Arc<AppState>) {
    if !config.retention_enabled() {
        tracing::info!("Data retention disabled");
        return;
    }
    let retention = RetentionService::new(
        state.repository.clone(),
        state.storage.clone(),
        RetentionPolicy::from_config(config),
    );
    Arc::new(retention).start();
    tracing::info!(
        upload_days = config.upload_retention_days(),
        request_days = config.request_retention_days(),
        result_days = config.result_retention_days(),
        "Data retention job started (runs every hour)"
    );
}
