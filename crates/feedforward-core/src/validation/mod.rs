//! Submission validation
//!
//! Every field and every file is checked, and every problem is reported in a
//! single error. A file over the size limit turns the whole result into a 413;
//! any other problem is a 400.

pub mod codes;

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{AppError, FieldError};
use crate::models::FileKind;

pub use codes::*;

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_AUDIENCE_LENGTH: usize = 2000;
pub const MAX_FILENAME_LENGTH: usize = 255;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

/// Size and count limits applied to uploaded files.
#[derive(Debug, Clone, Copy)]
pub struct ValidationLimits {
    pub max_file_size_bytes: u64,
    pub max_files: usize,
}

/// Metadata of one uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub filename: String,
    pub content_type: Option<String>,
    pub size_bytes: u64,
}

/// Raw submission fields before validation.
#[derive(Debug, Clone, Default)]
pub struct SubmissionInput {
    pub email: Option<String>,
    pub url: Option<String>,
    pub audience: Option<String>,
    pub files: Vec<FileCandidate>,
}

/// A file that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFile {
    /// Position in the submitted file list
    pub index: usize,
    pub filename: String,
    pub kind: FileKind,
    pub size_bytes: u64,
}

/// Normalized submission fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub email: String,
    pub url: Option<String>,
    pub audience: Option<String>,
    pub files: Vec<ValidatedFile>,
}

/// Trim and lower-case an email address for identity comparisons.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(raw: Option<&str>) -> Result<String, FieldError> {
    let email = raw.map(normalize_email).unwrap_or_default();
    if email.is_empty() {
        return Err(FieldError::new("email", MISSING_EMAIL, "Email is required"));
    }
    if email.len() > MAX_EMAIL_LENGTH || !EMAIL_RE.is_match(&email) {
        return Err(FieldError::new("email", INVALID_EMAIL, "Invalid email format"));
    }
    Ok(email)
}

/// Accepts absolute http(s) URLs with a host. Blank input counts as absent.
pub fn validate_url(raw: Option<&str>) -> Result<Option<String>, FieldError> {
    let Some(url) = raw.map(str::trim).filter(|u| !u.is_empty()) else {
        return Ok(None);
    };
    let parsed = reqwest::Url::parse(url)
        .map_err(|_| FieldError::new("url", INVALID_URL, "URL is not well-formed"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(FieldError::new(
            "url",
            INVALID_URL,
            "URL must use http or https",
        ));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(FieldError::new("url", INVALID_URL, "URL must have a host"));
    }
    Ok(Some(url.to_string()))
}

/// Rejects names that could address another directory once joined to a path.
pub fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename.len() <= MAX_FILENAME_LENGTH
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains('\0')
}

/// Check one file, returning every problem found with it.
pub fn validate_file(
    index: usize,
    file: &FileCandidate,
    limits: &ValidationLimits,
) -> Result<ValidatedFile, Vec<FieldError>> {
    let field = format!("files[{}]", index);
    let mut errors = Vec::new();

    if !is_safe_filename(&file.filename) {
        errors.push(FieldError::new(
            &field,
            INVALID_FILENAME,
            format!("Invalid filename: {}", file.filename),
        ));
    }

    if file.size_bytes == 0 {
        errors.push(FieldError::new(&field, EMPTY_FILE, "File is empty"));
    } else if file.size_bytes > limits.max_file_size_bytes {
        errors.push(FieldError::new(
            &field,
            FILE_TOO_LARGE,
            format!(
                "File {} is {} bytes; maximum is {} bytes",
                file.filename, file.size_bytes, limits.max_file_size_bytes
            ),
        ));
    }

    let kind = FileKind::detect(&file.filename, file.content_type.as_deref());
    if kind.is_none() {
        errors.push(FieldError::new(
            &field,
            INVALID_FILE_TYPE,
            format!(
                "Unsupported file type for {}. Allowed types: PDF, PPTX, DOCX",
                file.filename
            ),
        ));
    }

    match kind {
        Some(kind) if errors.is_empty() => Ok(ValidatedFile {
            index,
            filename: file.filename.clone(),
            kind,
            size_bytes: file.size_bytes,
        }),
        _ => Err(errors),
    }
}

/// Validate a whole submission, collecting every problem before failing.
pub fn validate_submission(
    input: &SubmissionInput,
    limits: &ValidationLimits,
) -> Result<ValidatedSubmission, AppError> {
    let mut errors = Vec::new();

    let email = validate_email(input.email.as_deref()).map_err(|e| errors.push(e)).ok();
    let url = validate_url(input.url.as_deref())
        .map_err(|e| errors.push(e))
        .ok()
        .flatten();

    let audience = input
        .audience
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string);
    if audience
        .as_ref()
        .is_some_and(|a| a.chars().count() > MAX_AUDIENCE_LENGTH)
    {
        errors.push(FieldError::new(
            "audience",
            AUDIENCE_TOO_LONG,
            format!("Audience must be at most {} characters", MAX_AUDIENCE_LENGTH),
        ));
    }

    if input.files.len() > limits.max_files {
        errors.push(FieldError::new(
            "files",
            TOO_MANY_FILES,
            format!("At most {} files may be submitted", limits.max_files),
        ));
    }

    let mut files = Vec::with_capacity(input.files.len());
    for (index, file) in input.files.iter().enumerate() {
        match validate_file(index, file, limits) {
            Ok(valid) => files.push(valid),
            Err(file_errors) => errors.extend(file_errors),
        }
    }

    let url_given = input
        .url
        .as_deref()
        .is_some_and(|u| !u.trim().is_empty());
    if !url_given && input.files.is_empty() {
        errors.push(FieldError::new(
            "url",
            MISSING_CONTENT,
            "Either a URL or at least one file must be provided",
        ));
    }

    match email {
        Some(email) if errors.is_empty() => Ok(ValidatedSubmission {
            email,
            url,
            audience,
            files,
        }),
        _ => Err(AppError::from_field_errors(errors)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorMetadata;

    const MAX: u64 = 50 * 1024 * 1024;

    fn limits() -> ValidationLimits {
        ValidationLimits {
            max_file_size_bytes: MAX,
            max_files: 10,
        }
    }

    fn pdf(size: u64) -> FileCandidate {
        FileCandidate {
            filename: "deck.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            size_bytes: size,
        }
    }

    fn input(files: Vec<FileCandidate>) -> SubmissionInput {
        SubmissionInput {
            email: Some("  Person@Example.COM ".to_string()),
            url: None,
            audience: None,
            files,
        }
    }

    #[test]
    fn test_email_is_normalized() {
        let valid = validate_submission(&input(vec![pdf(10)]), &limits()).unwrap();
        assert_eq!(valid.email, "person@example.com");
    }

    #[test]
    fn test_file_at_exact_limit_is_accepted() {
        let valid = validate_submission(&input(vec![pdf(MAX)]), &limits()).unwrap();
        assert_eq!(valid.files[0].size_bytes, MAX);
        assert_eq!(valid.files[0].kind, FileKind::Pdf);
    }

    #[test]
    fn test_file_one_byte_over_is_413() {
        let err = validate_submission(&input(vec![pdf(MAX + 1)]), &limits()).unwrap_err();
        assert_eq!(err.http_status_code(), 413);
    }

    #[test]
    fn test_all_problems_are_reported() {
        let submission = SubmissionInput {
            email: Some("not-an-email".to_string()),
            url: Some("ftp://example.com/file".to_string()),
            audience: None,
            files: vec![FileCandidate {
                filename: "../etc/passwd".to_string(),
                content_type: Some("text/plain".to_string()),
                size_bytes: 3,
            }],
        };
        let err = validate_submission(&submission, &limits()).unwrap_err();
        let AppError::Validation { errors, .. } = err else {
            panic!("expected validation error");
        };
        let codes: Vec<&str> = errors.iter().map(|e| e.code.as_str()).collect();
        assert!(codes.contains(&INVALID_EMAIL));
        assert!(codes.contains(&INVALID_URL));
        assert!(codes.contains(&INVALID_FILENAME));
        assert!(codes.contains(&INVALID_FILE_TYPE));
    }

    #[test]
    fn test_url_or_file_required() {
        let err = validate_submission(&input(vec![]), &limits()).unwrap_err();
        let AppError::Validation { errors, .. } = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors[0].code, MISSING_CONTENT);
    }

    #[test]
    fn test_url_only_submission() {
        let mut submission = input(vec![]);
        submission.url = Some("https://example.com".to_string());
        let valid = validate_submission(&submission, &limits()).unwrap();
        assert_eq!(valid.url.as_deref(), Some("https://example.com"));
        assert!(valid.files.is_empty());
    }

    #[test]
    fn test_too_many_files() {
        let files = (0..11).map(|_| pdf(1)).collect();
        let err = validate_submission(&input(files), &limits()).unwrap_err();
        assert_eq!(err.http_status_code(), 400);
    }

    #[test]
    fn test_unsafe_filenames() {
        assert!(!is_safe_filename("..\\secret.pdf"));
        assert!(!is_safe_filename("dir/deck.pdf"));
        assert!(!is_safe_filename(""));
        assert!(is_safe_filename("Q3 results.pdf"));
    }
}
