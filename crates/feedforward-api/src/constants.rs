//! API constants
//!
//! Every public route lives under `/api/v1`. Handler path annotations use the
//! literal prefix because utoipa needs compile-time strings.

/// API base path prefix (version-independent)
pub const API_BASE: &str = "/api";

pub const API_VERSION: &str = "v1";

/// Versioned prefix for all routes except health and docs
pub const API_PREFIX: &str = "/api/v1";

