//! Stable machine-readable codes for field-level validation errors.

pub const MISSING_EMAIL: &str = "MISSING_EMAIL";
pub const INVALID_EMAIL: &str = "INVALID_EMAIL";
pub const INVALID_URL: &str = "INVALID_URL";
pub const MISSING_CONTENT: &str = "MISSING_CONTENT";
pub const FILE_TOO_LARGE: &str = "FILE_TOO_LARGE";
pub const INVALID_FILE_TYPE: &str = "INVALID_FILE_TYPE";
pub const INVALID_FILENAME: &str = "INVALID_FILENAME";
pub const EMPTY_FILE: &str = "EMPTY_FILE";
pub const TOO_MANY_FILES: &str = "TOO_MANY_FILES";
pub const AUDIENCE_TOO_LONG: &str = "AUDIENCE_TOO_LONG";
