use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_ERROR_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TrackedError {
    /// Stable error type, e.g. `upstream_timeout` or `delivery_failure`
    pub category: String,
    pub message: String,
    #[schema(value_type = Object)]
    pub context: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorStats {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub error_rate_per_minute: f64,
    /// Newest first
    pub recent: Vec<TrackedError>,
}

/// Bounded log of errors captured by the pipeline.
pub struct ErrorTracker {
    errors: Mutex<VecDeque<TrackedError>>,
    capacity: usize,
}

impl Default for ErrorTracker {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_CAPACITY)
    }
}

impl ErrorTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            errors: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    fn errors(&self) -> std::sync::MutexGuard<'_, VecDeque<TrackedError>> {
        self.errors
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn capture(
        &self,
        category: impl Into<String>,
        message: impl Into<String>,
        context: serde_json::Value,
    ) {
        self.capture_at(category, message, context, Utc::now());
    }

    pub fn capture_at(
        &self,
        category: impl Into<String>,
        message: impl Into<String>,
        context: serde_json::Value,
        at: DateTime<Utc>,
    ) {
        let entry = TrackedError {
            category: category.into(),
            message: message.into(),
            context,
            timestamp: at,
        };
        tracing::warn!(
            category = %entry.category,
            context = %entry.context,
            "Error tracked: {}",
            entry.message
        );

        let mut errors = self.errors();
        errors.push_back(entry);
        while errors.len() > self.capacity {
            errors.pop_front();
        }
    }

    /// Up to `limit` errors, newest first.
    pub fn recent(&self, limit: usize) -> Vec<TrackedError> {
        self.errors().iter().rev().take(limit).cloned().collect()
    }

    pub fn counts_by_category(&self, window: Duration) -> BTreeMap<String, usize> {
        self.stats_at(window, Utc::now()).by_category
    }

    pub fn error_rate_per_minute(&self, window: Duration) -> f64 {
        self.stats_at(window, Utc::now()).error_rate_per_minute
    }

    pub fn stats(&self, window: Duration) -> ErrorStats {
        self.stats_at(window, Utc::now())
    }

    pub fn stats_at(&self, window: Duration, now: DateTime<Utc>) -> ErrorStats {
        let since = now.checked_sub_signed(window);
        let errors = self.errors();
        let in_window: Vec<&TrackedError> = errors
            .iter()
            .filter(|e| since.is_none_or(|since| e.timestamp >= since))
            .collect();

        let mut by_category = BTreeMap::new();
        for error in &in_window {
            *by_category.entry(error.category.clone()).or_insert(0) += 1;
        }

        let minutes = window.num_milliseconds() as f64 / 60_000.0;
        let error_rate_per_minute = if minutes > 0.0 {
            in_window.len() as f64 / minutes
        } else {
            0.0
        };

        ErrorStats {
            total: in_window.len(),
            by_category,
            error_rate_per_minute,
            recent: in_window.iter().rev().take(10).map(|e| (*e).clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recent_is_newest_first() {
        let tracker = ErrorTracker::default();
        tracker.capture("upstream_timeout", "first", json!({}));
        tracker.capture("delivery_failure", "second", json!({}));
        let recent = tracker.recent(10);
        assert_eq!(recent[0].message, "second");
        assert_eq!(recent[1].message, "first");
        assert_eq!(tracker.recent(1).len(), 1);
    }

    #[test]
    fn test_stats_respect_window() {
        let tracker = ErrorTracker::default();
        let now = Utc::now();
        tracker.capture_at("upstream_failure", "old", json!({}), now - Duration::hours(2));
        for _ in 0..3 {
            tracker.capture_at("upstream_failure", "new", json!({}), now);
        }
        tracker.capture_at("delivery_failure", "new", json!({"requestId": "x"}), now);

        let stats = tracker.stats_at(Duration::hours(1), now);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.by_category["upstream_failure"], 3);
        assert_eq!(stats.by_category["delivery_failure"], 1);
        assert!((stats.error_rate_per_minute - 4.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_unbounded_window_counts_everything() {
        let tracker = ErrorTracker::default();
        let now = Utc::now();
        tracker.capture_at("internal", "ancient", json!({}), now - Duration::days(3650));

        let stats = tracker.stats_at(Duration::MAX, now);
        assert_eq!(stats.total, 1);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let tracker = ErrorTracker::new(3);
        for i in 0..5 {
            tracker.capture("internal", format!("e{}", i), json!(null));
        }
        let recent = tracker.recent(100);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[2].message, "e2");
    }
}
