use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Duration;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::IntoParams;

use crate::error::HttpAppError;
use crate::services::ObservabilitySnapshot;
use crate::state::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct MetricsQuery {
    /// Trailing window in milliseconds; all retained samples when absent
    pub window: Option<u64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/metrics",
    tag = "metrics",
    params(MetricsQuery),
    responses(
        (status = 200, description = "Processing metrics, error counts and recent alerts", body = ObservabilitySnapshot)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<ObservabilitySnapshot>, HttpAppError> {
    let window = query
        .window
        .map(|ms| {
            i64::try_from(ms)
                .ok()
                .and_then(Duration::try_milliseconds)
                .unwrap_or(Duration::MAX)
        });
    Ok(Json(state.observability.snapshot(window)))
}
