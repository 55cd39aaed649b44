//! Error types module
//!
//! Every failure in the submission pipeline is expressed as an `AppError`.
//! The variants follow the pipeline's error taxonomy: input problems resolved at
//! the HTTP boundary (validation, file size, rate limiting), lookups, lifecycle
//! guards, upstream AI failures, and best-effort delivery failures.
//!
//! The `Database` variant wraps `sqlx::Error` when the `sqlx` feature is on.

use std::io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

use crate::models::RequestStatus;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors like validation failures
    Debug,
    /// Recoverable issues like rate limits or delivery problems
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "RATE_LIMIT_EXCEEDED")
    fn error_code(&self) -> &'static str;

    /// Whether the caller may retry the same operation later
    fn is_recoverable(&self) -> bool;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

/// One problem found while validating a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Admission dimension that rejected a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitReason {
    Email,
    Ip,
}

impl std::fmt::Display for RateLimitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateLimitReason::Email => write!(f, "email"),
            RateLimitReason::Ip => write!(f, "ip"),
        }
    }
}

/// Outcome of one admission dimension, reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LimitSnapshot {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Why a submission was refused by admission control, with both dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRejection {
    pub reason: RateLimitReason,
    pub message: String,
    pub email_limit: LimitSnapshot,
    pub ip_limit: LimitSnapshot,
}

impl RateLimitRejection {
    /// Snapshot of the dimension that caused the rejection.
    pub fn rejecting(&self) -> &LimitSnapshot {
        match self.reason {
            RateLimitReason::Email => &self.email_limit,
            RateLimitReason::Ip => &self.ip_limit,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("File too large: {message}")]
    FileTooLarge {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Rate limit exceeded: {}", .0.message)]
    RateLimited(Box<RateLimitRejection>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    #[error("Upstream timeout: {0}")]
    UpstreamTimeout(String),

    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("Delivery failure: {0}")]
    DeliveryFailure(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::BadRequest(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (u16, &'static str, bool, bool, LogLevel) {
    match err {
        AppError::Validation { .. } => (400, "VALIDATION_ERROR", false, false, LogLevel::Debug),
        AppError::FileTooLarge { .. } => (413, "FILE_TOO_LARGE", false, false, LogLevel::Debug),
        AppError::RateLimited(_) => (429, "RATE_LIMIT_EXCEEDED", true, false, LogLevel::Warn),
        AppError::BadRequest(_) => (400, "BAD_REQUEST", false, false, LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", false, false, LogLevel::Debug),
        AppError::InvalidTransition { .. } => {
            (409, "INVALID_TRANSITION", false, false, LogLevel::Warn)
        }
        AppError::UpstreamTimeout(_) => (504, "UPSTREAM_TIMEOUT", true, false, LogLevel::Error),
        AppError::UpstreamFailure(_) => (502, "UPSTREAM_FAILURE", true, false, LogLevel::Error),
        AppError::DeliveryFailure(_) => (502, "DELIVERY_FAILURE", true, true, LogLevel::Warn),
        AppError::Storage(_) => (500, "STORAGE_ERROR", true, true, LogLevel::Error),
        AppError::Database(_) => (500, "DATABASE_ERROR", true, true, LogLevel::Error),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            (500, "INTERNAL_ERROR", true, true, LogLevel::Error)
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Validation { message, .. } => message.clone(),
            AppError::FileTooLarge { message, .. } => message.clone(),
            AppError::RateLimited(rejection) => rejection.message.clone(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::InvalidTransition { from, to } => {
                format!("Cannot move request from {} to {}", from, to)
            }
            AppError::UpstreamTimeout(msg) => msg.clone(),
            AppError::UpstreamFailure(msg) => msg.clone(),
            AppError::DeliveryFailure(_) => "Report delivery failed".to_string(),
            AppError::Storage(_) => "File storage operation failed".to_string(),
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "An internal error occurred".to_string()
            }
        }
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }
}

impl AppError {
    /// Short variant name used in logs and in non-production responses.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "Validation",
            AppError::FileTooLarge { .. } => "FileTooLarge",
            AppError::RateLimited(_) => "RateLimited",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::InvalidTransition { .. } => "InvalidTransition",
            AppError::UpstreamTimeout(_) => "UpstreamTimeout",
            AppError::UpstreamFailure(_) => "UpstreamFailure",
            AppError::DeliveryFailure(_) => "DeliveryFailure",
            AppError::Storage(_) => "Storage",
            AppError::Database(_) => "Database",
            AppError::Internal(_) | AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Details safe to show to any client: field errors and admission diagnostics.
    pub fn public_details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::Validation { errors, .. } | AppError::FileTooLarge { errors, .. } => {
                serde_json::to_value(errors).ok()
            }
            AppError::RateLimited(rejection) => serde_json::to_value(rejection).ok(),
            _ => None,
        }
    }

    /// Full error message including the source chain.
    pub fn detailed_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            message.push_str(&format!(": {}", err));
            source = err.source();
        }
        message
    }

    /// Builds the validation error for a list of field problems.
    ///
    /// Any `FILE_TOO_LARGE` entry promotes the whole result to a 413.
    pub fn from_field_errors(errors: Vec<FieldError>) -> Self {
        let too_large = errors
            .iter()
            .any(|e| e.code == crate::validation::codes::FILE_TOO_LARGE);
        let message = errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        if too_large {
            AppError::FileTooLarge { message, errors }
        } else {
            AppError::Validation { message, errors }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_taxonomy() {
        assert_eq!(AppError::NotFound("x".into()).http_status_code(), 404);
        assert_eq!(
            AppError::UpstreamTimeout("slow".into()).http_status_code(),
            504
        );
        assert_eq!(
            AppError::UpstreamFailure("bad".into()).http_status_code(),
            502
        );
        assert_eq!(
            AppError::InvalidTransition {
                from: RequestStatus::Completed,
                to: RequestStatus::Processing
            }
            .error_code(),
            "INVALID_TRANSITION"
        );
    }

    #[test]
    fn test_field_errors_promote_to_413_when_file_too_large() {
        let err = AppError::from_field_errors(vec![
            FieldError::new("email", "INVALID_EMAIL", "Invalid email format"),
            FieldError::new(
                "files[0]",
                crate::validation::codes::FILE_TOO_LARGE,
                "File exceeds maximum size",
            ),
        ]);
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.error_code(), "FILE_TOO_LARGE");
        let details = err.public_details().unwrap();
        assert_eq!(details.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_field_errors_without_size_problem_are_400() {
        let err = AppError::from_field_errors(vec![FieldError::new(
            "url",
            "INVALID_URL",
            "URL must use http or https",
        )]);
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.client_message(), "URL must use http or https");
    }

    #[test]
    fn test_sensitive_errors_hide_internals() {
        let err = AppError::Internal("connection pool exhausted".into());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "An internal error occurred");
        assert!(err.detailed_message().contains("connection pool exhausted"));
    }
}
