use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_METRICS_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
struct DurationSample {
    duration_ms: u64,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct OutcomeSample {
    success: bool,
    timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct Buffers {
    durations: VecDeque<DurationSample>,
    outcomes: VecDeque<OutcomeSample>,
}

/// Processing statistics over the retained samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetricsSummary {
    /// Number of recorded outcomes
    pub count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Fraction in `[0, 1]`; zero when nothing was recorded
    pub success_rate: f64,
    pub average_ms: f64,
    pub median_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
}

/// Keeps the most recent processing durations and outcomes.
pub struct MetricsCollector {
    buffers: Mutex<Buffers>,
    capacity: usize,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_METRICS_CAPACITY)
    }
}

impl MetricsCollector {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffers: Mutex::new(Buffers::default()),
            capacity: capacity.max(1),
        }
    }

    fn buffers(&self) -> std::sync::MutexGuard<'_, Buffers> {
        self.buffers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_duration(&self, request_id: Uuid, duration_ms: u64) {
        self.record_duration_at(request_id, duration_ms, Utc::now());
    }

    pub fn record_duration_at(&self, request_id: Uuid, duration_ms: u64, at: DateTime<Utc>) {
        tracing::debug!(request_id = %request_id, duration_ms = duration_ms, "Processing duration recorded");
        let mut buffers = self.buffers();
        buffers.durations.push_back(DurationSample {
            duration_ms,
            timestamp: at,
        });
        while buffers.durations.len() > self.capacity {
            buffers.durations.pop_front();
        }
    }

    pub fn record_success(&self, request_id: Uuid) {
        self.record_outcome_at(request_id, true, Utc::now());
    }

    pub fn record_failure(&self, request_id: Uuid) {
        self.record_outcome_at(request_id, false, Utc::now());
    }

    pub fn record_outcome_at(&self, request_id: Uuid, success: bool, at: DateTime<Utc>) {
        tracing::debug!(request_id = %request_id, success = success, "Processing outcome recorded");
        let mut buffers = self.buffers();
        buffers.outcomes.push_back(OutcomeSample {
            success,
            timestamp: at,
        });
        while buffers.outcomes.len() > self.capacity {
            buffers.outcomes.pop_front();
        }
    }

    /// Statistics over every retained sample, or only those within the trailing `window`.
    pub fn summary(&self, window: Option<Duration>) -> MetricsSummary {
        self.summary_at(window, Utc::now())
    }

    pub fn summary_at(&self, window: Option<Duration>, now: DateTime<Utc>) -> MetricsSummary {
        // A window reaching past the representable range has no lower bound
        let since = window.and_then(|w| now.checked_sub_signed(w));
        let in_window = |ts: &DateTime<Utc>| since.is_none_or(|since| *ts >= since);

        let buffers = self.buffers();
        let mut durations: Vec<u64> = buffers
            .durations
            .iter()
            .filter(|s| in_window(&s.timestamp))
            .map(|s| s.duration_ms)
            .collect();
        let (success_count, failure_count) = buffers
            .outcomes
            .iter()
            .filter(|s| in_window(&s.timestamp))
            .fold((0, 0), |(ok, failed), s| {
                if s.success {
                    (ok + 1, failed)
                } else {
                    (ok, failed + 1)
                }
            });
        drop(buffers);

        let count = success_count + failure_count;
        let success_rate = if count == 0 {
            0.0
        } else {
            success_count as f64 / count as f64
        };

        let mut summary = MetricsSummary {
            count,
            success_count,
            failure_count,
            success_rate,
            ..Default::default()
        };

        if durations.is_empty() {
            return summary;
        }

        durations.sort_unstable();
        let n = durations.len();
        let total: u64 = durations.iter().sum();
        summary.average_ms = total as f64 / n as f64;
        summary.median_ms = if n % 2 == 0 {
            (durations[n / 2 - 1] + durations[n / 2]) as f64 / 2.0
        } else {
            durations[n / 2] as f64
        };
        summary.min_ms = durations[0];
        summary.max_ms = durations[n - 1];
        summary
    }
}
