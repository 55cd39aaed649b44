use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const OUTCOME_WINDOW: usize = 100;
const RETAINED_ALERTS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum AlertType {
    HighErrorRate,
    LongProcessingTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    #[schema(value_type = Object)]
    pub context: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AlertingConfig {
    /// Failure fraction above which `HighErrorRate` fires
    pub error_rate_threshold: f64,
    pub max_processing_time_ms: u64,
    pub cooldown: Duration,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            error_rate_threshold: 0.1,
            max_processing_time_ms: 10 * 60 * 1000,
            cooldown: Duration::minutes(5),
        }
    }
}

#[derive(Default)]
struct AlertState {
    outcomes: VecDeque<bool>,
    processing_times: VecDeque<u64>,
    last_fired: HashMap<AlertType, DateTime<Utc>>,
    fired: VecDeque<Alert>,
}

/// Watches the last 100 outcomes and processing times and raises alerts
/// when thresholds are crossed, at most once per cooldown per alert type.
pub struct AlertingService {
    config: AlertingConfig,
    state: Mutex<AlertState>,
}

impl AlertingService {
    pub fn new(config: AlertingConfig) -> Self {
        Self {
            config,
            state: Mutex::new(AlertState::default()),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, AlertState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_success(&self) {
        self.record_outcome(true);
    }

    pub fn record_error(&self) {
        self.record_outcome(false);
    }

    fn record_outcome(&self, success: bool) {
        let mut state = self.state();
        state.outcomes.push_back(success);
        while state.outcomes.len() > OUTCOME_WINDOW {
            state.outcomes.pop_front();
        }
    }

    pub fn record_processing_time(&self, duration_ms: u64) {
        let mut state = self.state();
        state.processing_times.push_back(duration_ms);
        while state.processing_times.len() > OUTCOME_WINDOW {
            state.processing_times.pop_front();
        }
    }

    pub fn check_alerts(&self) -> Vec<Alert> {
        self.check_alerts_at(Utc::now())
    }

    /// Evaluate thresholds and return the alerts that fired now.
    pub fn check_alerts_at(&self, now: DateTime<Utc>) -> Vec<Alert> {
        let mut state = self.state();
        let mut fired = Vec::new();

        let total = state.outcomes.len();
        let errors = state.outcomes.iter().filter(|ok| !**ok).count();
        if total > 0 {
            let error_rate = errors as f64 / total as f64;
            if error_rate > self.config.error_rate_threshold {
                fired.push(Alert {
                    alert_type: AlertType::HighErrorRate,
                    severity: AlertSeverity::Warning,
                    message: format!("High error rate detected: {:.2}%", error_rate * 100.0),
                    context: serde_json::json!({
                        "errorRate": error_rate,
                        "totalRequests": total,
                        "errors": errors,
                        "successes": total - errors,
                    }),
                    timestamp: now,
                });
            }
        }

        if let Some(max_time) = state.processing_times.iter().copied().max() {
            if max_time > self.config.max_processing_time_ms {
                fired.push(Alert {
                    alert_type: AlertType::LongProcessingTime,
                    severity: AlertSeverity::Warning,
                    message: format!(
                        "Long processing time detected: {:.2} minutes",
                        max_time as f64 / 60_000.0
                    ),
                    context: serde_json::json!({
                        "processingTimeMs": max_time,
                        "thresholdMs": self.config.max_processing_time_ms,
                    }),
                    timestamp: now,
                });
            }
        }

        let cooldown = self.config.cooldown;
        fired.retain(|alert| {
            state
                .last_fired
                .get(&alert.alert_type)
                .is_none_or(|last| now - *last > cooldown)
        });

        for alert in &fired {
            tracing::error!(
                alert_type = ?alert.alert_type,
                context = %alert.context,
                "{}",
                alert.message
            );
            state.last_fired.insert(alert.alert_type, now);
            state.fired.push_back(alert.clone());
            while state.fired.len() > RETAINED_ALERTS {
                state.fired.pop_front();
            }
        }

        fired
    }

    /// Up to `limit` fired alerts, newest first.
    pub fn recent_alerts(&self, limit: usize) -> Vec<Alert> {
        self.state().fired.iter().rev().take(limit).cloned().collect()
    }

    pub fn reset(&self) {
        *self.state() = AlertState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> AlertingService {
        AlertingService::new(AlertingConfig {
            error_rate_threshold: 0.1,
            max_processing_time_ms: 1000,
            cooldown: Duration::minutes(5),
        })
    }

    #[test]
    fn test_no_alerts_without_data() {
        assert!(service().check_alerts().is_empty());
    }

    #[test]
    fn test_high_error_rate_fires() {
        let alerting = service();
        for _ in 0..8 {
            alerting.record_success();
        }
        alerting.record_error();
        alerting.record_error();

        let alerts = alerting.check_alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::HighErrorRate);
        assert_eq!(alerts[0].message, "High error rate detected: 20.00%");
    }

    #[test]
    fn test_rate_at_threshold_does_not_fire() {
        let alerting = service();
        for _ in 0..9 {
            alerting.record_success();
        }
        alerting.record_error();
        assert!(alerting.check_alerts().is_empty());
    }

    #[test]
    fn test_cooldown_suppresses_repeat() {
        let alerting = service();
        alerting.record_processing_time(90_000);
        let now = Utc::now();

        let first = alerting.check_alerts_at(now);
        assert_eq!(first[0].message, "Long processing time detected: 1.50 minutes");
        assert!(alerting.check_alerts_at(now + Duration::minutes(5)).is_empty());
        assert_eq!(
            alerting
                .check_alerts_at(now + Duration::minutes(5) + Duration::seconds(1))
                .len(),
            1
        );
        assert_eq!(alerting.recent_alerts(10).len(), 2);
    }

    #[test]
    fn test_outcome_window_rolls() {
        let alerting = service();
        for _ in 0..50 {
            alerting.record_error();
        }
        for _ in 0..100 {
            alerting.record_success();
        }
        assert!(alerting.check_alerts().is_empty());
    }
}
