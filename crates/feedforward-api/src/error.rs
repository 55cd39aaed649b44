//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`; domain errors convert with `?`
//! and render with a consistent status, body and log line.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use feedforward_core::{AppError, ErrorMetadata, LimitSnapshot, LogLevel, RateLimitRejection};
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message safe to show to the client
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether retrying the same call later can succeed
    pub recoverable: bool,
    /// Field errors or rate-limit diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Full error chain; only outside production
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<String>,
}

/// Wrapper type for AppError to implement IntoResponse (orphan rule).
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

impl From<feedforward_storage::StorageError> for HttpAppError {
    fn from(err: feedforward_storage::StorageError) -> Self {
        HttpAppError(err.into())
    }
}

impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::BadRequest(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that answers malformed bodies with our 400 body shape.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

fn is_production_env() -> bool {
    std::env::var("ENVIRONMENT")
        .map(|env| {
            let env = env.to_lowercase();
            env == "production" || env == "prod"
        })
        .unwrap_or(false)
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: String) {
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

/// `X-RateLimit-*` headers for both admission dimensions.
pub fn rate_limit_headers(email: &LimitSnapshot, ip: &LimitSnapshot) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert_header(&mut headers, "x-ratelimit-limit-email", email.limit.to_string());
    insert_header(&mut headers, "x-ratelimit-limit-ip", ip.limit.to_string());
    insert_header(&mut headers, "x-ratelimit-remaining-email", email.remaining.to_string());
    insert_header(&mut headers, "x-ratelimit-remaining-ip", ip.remaining.to_string());
    insert_header(&mut headers, "x-ratelimit-reset-email", email.reset_at.to_rfc3339());
    insert_header(&mut headers, "x-ratelimit-reset-ip", ip.reset_at.to_rfc3339());
    headers
}

fn rejection_headers(rejection: &RateLimitRejection) -> HeaderMap {
    let mut headers = rate_limit_headers(&rejection.email_limit, &rejection.ip_limit);
    let retry_after = (rejection.rejecting().reset_at - Utc::now())
        .num_seconds()
        .max(1);
    insert_header(&mut headers, "retry-after", retry_after.to_string());
    headers
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        let is_production = is_production_env();

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let show_debug = !is_production && !app_error.is_sensitive();
        let body = ErrorResponse {
            error: app_error.client_message(),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            details: app_error.public_details(),
            error_type: show_debug.then(|| app_error.error_type().to_string()),
            debug: (!is_production).then(|| app_error.detailed_message()),
        };

        let headers = match app_error {
            AppError::RateLimited(rejection) => rejection_headers(rejection),
            _ => HeaderMap::new(),
        };

        (status, headers, Json(body)).into_response()
    }
}
