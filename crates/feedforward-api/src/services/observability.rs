//! Pipeline-facing wrapper over the in-process metrics, error and alert collectors.

use chrono::Duration;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use feedforward_core::{AppError, Config};
use feedforward_infra::{
    Alert, AlertingConfig, AlertingService, ErrorStats, ErrorTracker, MetricsCollector,
    MetricsSummary,
};

use super::email::{Mailer, OutgoingEmail};

const DEFAULT_ERROR_WINDOW_MINUTES: i64 = 60;
const RECENT_ALERTS: usize = 20;

/// Body of `GET /api/v1/metrics`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ObservabilitySnapshot {
    pub metrics: MetricsSummary,
    pub errors: ErrorStats,
    pub alerts: Vec<Alert>,
}

#[derive(Clone)]
pub struct PipelineObservability {
    metrics: Arc<MetricsCollector>,
    errors: Arc<ErrorTracker>,
    alerting: Arc<AlertingService>,
    mailer: Arc<dyn Mailer>,
    alert_email: Option<String>,
}

impl PipelineObservability {
    pub fn new(
        alerting_config: AlertingConfig,
        mailer: Arc<dyn Mailer>,
        alert_email: Option<String>,
    ) -> Self {
        Self {
            metrics: Arc::new(MetricsCollector::default()),
            errors: Arc::new(ErrorTracker::default()),
            alerting: Arc::new(AlertingService::new(alerting_config)),
            mailer,
            alert_email,
        }
    }

    pub fn from_config(config: &Config, mailer: Arc<dyn Mailer>) -> Self {
        let alerting = AlertingConfig {
            error_rate_threshold: config.alert_error_rate_threshold(),
            max_processing_time_ms: config.alert_max_processing_time_ms(),
            cooldown: Duration::from_std(config.alert_cooldown())
                .unwrap_or_else(|_| Duration::minutes(5)),
        };
        Self::new(
            alerting,
            mailer,
            config.alert_email().map(str::to_string),
        )
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    pub fn errors(&self) -> &ErrorTracker {
        &self.errors
    }

    pub fn alerting(&self) -> &AlertingService {
        &self.alerting
    }

    /// Record a finished AI call and evaluate alerts.
    pub fn record_outcome(&self, request_id: Uuid, success: bool, duration_ms: u64) {
        self.metrics.record_duration(request_id, duration_ms);
        self.alerting.record_processing_time(duration_ms);
        if success {
            self.metrics.record_success(request_id);
            self.alerting.record_success();
        } else {
            self.metrics.record_failure(request_id);
            self.alerting.record_error();
        }
        self.check_alerts();
    }

    /// Capture an error under its stable category.
    pub fn capture_error(&self, request_id: Uuid, stage: &str, error: &AppError) {
        self.errors.capture(
            error.error_type(),
            error.to_string(),
            serde_json::json!({
                "request_id": request_id,
                "stage": stage,
            }),
        );
    }

    fn check_alerts(&self) {
        let alerts = self.alerting.check_alerts();
        let Some(to) = self.alert_email.clone() else {
            return;
        };
        for alert in alerts {
            let mailer = self.mailer.clone();
            let to = to.clone();
            tokio::spawn(async move {
                if let Err(e) = mailer.send(alert_email(&to, &alert)).await {
                    tracing::warn!(error = %e, alert_type = ?alert.alert_type, "Failed to send alert email");
                }
            });
        }
    }

    /// Window defaults to the last hour for errors and to everything retained for metrics.
    pub fn snapshot(&self, window: Option<Duration>) -> ObservabilitySnapshot {
        let error_window = window.unwrap_or_else(|| Duration::minutes(DEFAULT_ERROR_WINDOW_MINUTES));
        ObservabilitySnapshot {
            metrics: self.metrics.summary(window),
            errors: self.errors.stats(error_window),
            alerts: self.alerting.recent_alerts(RECENT_ALERTS),
        }
    }
}

fn alert_email(to: &str, alert: &Alert) -> OutgoingEmail {
    let context = serde_json::to_string_pretty(&alert.context).unwrap_or_default();
    OutgoingEmail {
        to: to.to_string(),
        subject: format!("[Feedforward] {:?} alert: {}", alert.severity, alert.message),
        text: format!(
            "{}\n\nTime: {}\n\nContext:\n{}",
            alert.message,
            alert.timestamp.to_rfc3339(),
            context
        ),
        html: None,
        attachments: vec![],
    }
}
