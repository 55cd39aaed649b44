//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p feedforward-api`. Everything runs
//! in memory; the AI service, mail transport and task dispatcher are scripted.

pub mod fakes;
pub mod fixtures;

use axum_test::TestServer;
use feedforward_api::constants;
use feedforward_api::setup::routes;
use feedforward_api::setup::{build_state, AppComponents};
use feedforward_api::state::AppState;
use feedforward_core::Config;
use feedforward_infra::AdmissionControl;
use feedforward_storage::InMemoryStorage;
use std::sync::Arc;

use fakes::{FaultyRepository, RecordingDispatcher, RecordingMailer, ScriptedAiClient};

/// API path prefix for tests (e.g. `/api/v1`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server plus handles on every collaborator.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub repository: Arc<FaultyRepository>,
    pub storage: Arc<InMemoryStorage>,
    pub ai: Arc<ScriptedAiClient>,
    pub mailer: Arc<RecordingMailer>,
    pub dispatcher: Arc<RecordingDispatcher>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

fn base_vars() -> Vec<(String, String)> {
    [
        ("ENVIRONMENT", "test"),
        ("STORAGE_BACKEND", "memory"),
        ("RETENTION_ENABLED", "false"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Setup test app with default limits.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(&[]).await
}

/// Setup test app; `overrides` are applied on top of the base variables.
pub async fn setup_test_app_with(overrides: &[(&str, &str)]) -> TestApp {
    build_test_app(overrides, None).await
}

/// Setup test app whose admission control is `admission` instead of the configured limits.
pub async fn setup_test_app_with_admission(admission: Arc<dyn AdmissionControl>) -> TestApp {
    build_test_app(&[], Some(admission)).await
}

async fn build_test_app(
    overrides: &[(&str, &str)],
    admission: Option<Arc<dyn AdmissionControl>>,
) -> TestApp {
    let mut vars = base_vars();
    vars.extend(overrides.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    let config = Config::from_vars(vars).expect("Invalid test configuration");

    let repository = Arc::new(FaultyRepository::default());
    let storage = Arc::new(InMemoryStorage::new());
    let ai = Arc::new(ScriptedAiClient::default());
    let mailer = Arc::new(RecordingMailer::default());
    let dispatcher = Arc::new(RecordingDispatcher::default());

    let components = AppComponents {
        repository: repository.clone(),
        storage: storage.clone(),
        ai_client: ai.clone(),
        mailer: mailer.clone(),
        dispatcher: Some(dispatcher.clone()),
        admission,
    };
    let state = build_state(&config, components).expect("Failed to build state");
    let app = routes::setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        repository,
        storage,
        ai,
        mailer,
        dispatcher,
    }
}
