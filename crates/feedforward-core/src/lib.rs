//! Feedforward Core Library
//!
//! Domain models, error types, configuration, and input validation shared by
//! every Feedforward component.

pub mod config;
pub mod error;
pub mod models;
pub mod task_error;
pub mod validation;

// Re-export commonly used types
pub use config::{Config, StorageBackend, TaskDispatchMode};
pub use error::{
    AppError, ErrorMetadata, FieldError, LimitSnapshot, LogLevel, RateLimitReason,
    RateLimitRejection,
};
pub use task_error::TaskError;
