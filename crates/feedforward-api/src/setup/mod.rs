//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::Result;
use feedforward_core::Config;
use std::sync::Arc;

pub use services::{build_state, start_background_jobs, AppComponents};

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    feedforward_infra::init_telemetry(config.environment())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(environment = %config.environment(), "Configuration loaded and validated");

    let repository = database::setup_repository(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let components = AppComponents::from_config(&config, repository, storage)?;
    let state = build_state(&config, components)?;
    start_background_jobs(&config, &state);

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
