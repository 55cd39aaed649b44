//! Storage setup

use anyhow::{Context, Result};
use feedforward_core::Config;
use feedforward_storage::{create_storage, Storage};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    create_storage(config)
        .await
        .context("Failed to initialize storage backend")
}
