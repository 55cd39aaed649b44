//! Admission control
//!
//! Fixed-window counters per email and per client IP. Counters live in
//! process memory and are only consistent within a single instance.

pub use admission::{
    describe_window, AdmissionControl, AdmissionController, AdmissionDecision,
};
pub use limiter::{FixedWindowLimiter, LimitConfig, LimitDecision};

mod admission;
mod limiter;

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit store lock poisoned")]
    Poisoned,
}
