//! Database setup and initialization

use anyhow::{Context, Result};
use feedforward_core::Config;
use feedforward_db::{EvaluationRepository, InMemoryEvaluationRepository, PgEvaluationRepository};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Connect and migrate when `DATABASE_URL` is set; otherwise keep everything in memory.
pub async fn setup_repository(config: &Config) -> Result<Arc<dyn EvaluationRepository>> {
    match config.database_url() {
        Some(url) => {
            let pool = setup_database(config, url).await?;
            Ok(Arc::new(PgEvaluationRepository::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory repository, data is lost on restart");
            Ok(Arc::new(InMemoryEvaluationRepository::new()))
        }
    }
}

async fn setup_database(config: &Config, url: &str) -> Result<PgPool> {
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections())
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds()))
        .idle_timeout(Duration::from_secs(600))
        .connect(url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!(
        max_connections = config.db_max_connections(),
        "Database connected successfully"
    );

    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    Ok(pool)
}
