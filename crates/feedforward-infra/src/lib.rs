//! Feedforward Infrastructure Library
//!
//! Shared infrastructure used by the API and the task handler:
//! - Admission control (fixed-window rate limiting per email and per client IP)
//! - In-process observability (metrics, error tracking, alerting)
//! - Telemetry initialization

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod observability;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry};

pub use observability::{
    Alert, AlertSeverity, AlertType, AlertingConfig, AlertingService, ErrorStats, ErrorTracker,
    MetricsCollector, MetricsSummary, TrackedError,
};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{
    AdmissionControl, AdmissionController, AdmissionDecision, FixedWindowLimiter, LimitConfig,
    LimitDecision, RateLimitError,
};
