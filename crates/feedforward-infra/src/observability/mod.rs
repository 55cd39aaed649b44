//! In-process pipeline observability
//!
//! Bounded rolling buffers for processing metrics, captured errors and fired
//! alerts. State is per instance and is lost on restart.

mod alerting;
mod error_tracker;
mod metrics;

pub use alerting::{Alert, AlertSeverity, AlertType, AlertingConfig, AlertingService};
pub use error_tracker::{ErrorStats, ErrorTracker, TrackedError};
pub use metrics::{MetricsCollector, MetricsSummary};
