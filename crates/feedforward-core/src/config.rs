//! Configuration module
//!
//! Settings are read from the process environment (after loading `.env` if
//! present) with `envy`. Every value has a default suitable for local
//! development; `Config::validate` rejects combinations that cannot work.

use serde::Deserialize;

const PORT: u16 = 3000;
const DB_MAX_CONNECTIONS: u32 = 10;
const DB_TIMEOUT_SECONDS: u64 = 30;
const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;
const MAX_FILES_PER_SUBMISSION: usize = 10;
const EMAIL_RATE_LIMIT: u32 = 3;
const EMAIL_RATE_WINDOW_SECONDS: u64 = 24 * 60 * 60;
const IP_RATE_LIMIT: u32 = 5;
const IP_RATE_WINDOW_SECONDS: u64 = 60 * 60;
const AI_TIMEOUT_SECONDS: u64 = 10 * 60;
const ESTIMATED_COMPLETION_MINUTES: i64 = 10;
const TASK_MAX_WORKERS: usize = 4;
const TASK_MAX_RETRIES: u32 = 3;
const ALERT_ERROR_RATE_THRESHOLD: f64 = 0.1;
const ALERT_MAX_PROCESSING_TIME_MS: u64 = 10 * 60 * 1000;
const ALERT_COOLDOWN_SECONDS: u64 = 5 * 60;
const UPLOAD_RETENTION_DAYS: i64 = 30;
const REQUEST_RETENTION_DAYS: i64 = 90;
const RESULT_RETENTION_DAYS: i64 = 365;

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Local,
    Memory,
}

/// How processing tasks reach the task handler.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskDispatchMode {
    /// In-process queue with a worker pool
    Local,
    /// POST to an external dispatcher that calls back the task endpoint
    Http,
}

fn default_port() -> u16 {
    PORT
}
fn default_environment() -> String {
    "development".to_string()
}
fn default_db_max_connections() -> u32 {
    DB_MAX_CONNECTIONS
}
fn default_db_timeout_seconds() -> u64 {
    DB_TIMEOUT_SECONDS
}
fn default_storage_backend() -> StorageBackend {
    StorageBackend::Local
}
fn default_local_storage_path() -> String {
    "./data/uploads".to_string()
}
fn default_storage_bucket_name() -> String {
    "feedforward-uploads".to_string()
}
fn default_max_file_size_bytes() -> u64 {
    MAX_FILE_SIZE_BYTES
}
fn default_max_files() -> usize {
    MAX_FILES_PER_SUBMISSION
}
fn default_email_rate_limit() -> u32 {
    EMAIL_RATE_LIMIT
}
fn default_email_rate_window_seconds() -> u64 {
    EMAIL_RATE_WINDOW_SECONDS
}
fn default_ip_rate_limit() -> u32 {
    IP_RATE_LIMIT
}
fn default_ip_rate_window_seconds() -> u64 {
    IP_RATE_WINDOW_SECONDS
}
fn default_trusted_proxy_count() -> usize {
    1
}
fn default_ai_processing_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_ai_timeout_seconds() -> u64 {
    AI_TIMEOUT_SECONDS
}
fn default_estimated_completion_minutes() -> i64 {
    ESTIMATED_COMPLETION_MINUTES
}
fn default_task_dispatch_mode() -> TaskDispatchMode {
    TaskDispatchMode::Local
}
fn default_task_max_workers() -> usize {
    TASK_MAX_WORKERS
}
fn default_task_max_retries() -> u32 {
    TASK_MAX_RETRIES
}
fn default_smtp_port() -> u16 {
    587
}
fn default_true() -> bool {
    true
}
fn default_cors_origins() -> String {
    "*".to_string()
}
fn default_alert_error_rate_threshold() -> f64 {
    ALERT_ERROR_RATE_THRESHOLD
}
fn default_alert_max_processing_time_ms() -> u64 {
    ALERT_MAX_PROCESSING_TIME_MS
}
fn default_alert_cooldown_seconds() -> u64 {
    ALERT_COOLDOWN_SECONDS
}
fn default_upload_retention_days() -> i64 {
    UPLOAD_RETENTION_DAYS
}
fn default_request_retention_days() -> i64 {
    REQUEST_RETENTION_DAYS
}
fn default_result_retention_days() -> i64 {
    RESULT_RETENTION_DAYS
}

/// Flat view of the environment, one field per variable.
#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_timeout_seconds")]
    pub db_timeout_seconds: u64,
    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,
    #[serde(default = "default_local_storage_path")]
    pub local_storage_path: String,
    #[serde(default = "default_storage_bucket_name")]
    pub storage_bucket_name: String,
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: u64,
    #[serde(default = "default_max_files")]
    pub max_files_per_submission: usize,
    #[serde(default = "default_email_rate_limit")]
    pub email_rate_limit: u32,
    #[serde(default = "default_email_rate_window_seconds")]
    pub email_rate_window_seconds: u64,
    #[serde(default = "default_ip_rate_limit")]
    pub ip_rate_limit: u32,
    #[serde(default = "default_ip_rate_window_seconds")]
    pub ip_rate_window_seconds: u64,
    #[serde(default = "default_trusted_proxy_count")]
    pub trusted_proxy_count: usize,
    #[serde(default = "default_ai_processing_url")]
    pub ai_processing_url: String,
    #[serde(default = "default_ai_timeout_seconds")]
    pub ai_timeout_seconds: u64,
    #[serde(default = "default_estimated_completion_minutes")]
    pub estimated_completion_minutes: i64,
    #[serde(default = "default_task_dispatch_mode")]
    pub task_dispatch_mode: TaskDispatchMode,
    #[serde(default)]
    pub task_handler_url: Option<String>,
    #[serde(default = "default_task_max_workers")]
    pub task_max_workers: usize,
    #[serde(default = "default_task_max_retries")]
    pub task_max_retries: u32,
    #[serde(default)]
    pub smtp_enabled: bool,
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    #[serde(default)]
    pub smtp_from: Option<String>,
    #[serde(default = "default_true")]
    pub smtp_tls: bool,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    #[serde(default = "default_alert_error_rate_threshold")]
    pub alert_error_rate_threshold: f64,
    #[serde(default = "default_alert_max_processing_time_ms")]
    pub alert_max_processing_time_ms: u64,
    #[serde(default = "default_alert_cooldown_seconds")]
    pub alert_cooldown_seconds: u64,
    #[serde(default)]
    pub alert_email: Option<String>,
    #[serde(default = "default_true")]
    pub retention_enabled: bool,
    #[serde(default = "default_upload_retention_days")]
    pub upload_retention_days: i64,
    #[serde(default = "default_request_retention_days")]
    pub request_retention_days: i64,
    #[serde(default = "default_result_retention_days")]
    pub result_retention_days: i64,
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config(Settings);

impl Config {
    /// Load `.env` (if any), read the environment and validate the result.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let settings: Settings = envy::from_env()
            .map_err(|e| anyhow::anyhow!("Invalid environment configuration: {}", e))?;
        let config = Config(settings);
        config.validate()?;
        Ok(config)
    }

    /// Build from explicit key/value pairs instead of the process environment.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, anyhow::Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let settings: Settings = envy::from_iter(vars.into_iter().map(|(k, v)| (k.into(), v.into())))
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
        let config = Config(settings);
        config.validate()?;
        Ok(config)
    }

    pub fn settings(&self) -> &Settings {
        &self.0
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let s = &self.0;

        if s.email_rate_limit == 0 || s.ip_rate_limit == 0 {
            return Err(anyhow::anyhow!(
                "EMAIL_RATE_LIMIT and IP_RATE_LIMIT must be greater than zero"
            ));
        }
        if s.email_rate_window_seconds == 0 || s.ip_rate_window_seconds == 0 {
            return Err(anyhow::anyhow!("Rate limit windows must be greater than zero"));
        }
        if s.max_file_size_bytes == 0 || s.max_files_per_submission == 0 {
            return Err(anyhow::anyhow!(
                "MAX_FILE_SIZE_BYTES and MAX_FILES_PER_SUBMISSION must be greater than zero"
            ));
        }
        if s.smtp_enabled && (s.smtp_host.is_none() || s.smtp_from.is_none()) {
            return Err(anyhow::anyhow!(
                "SMTP_ENABLED=true requires SMTP_HOST and SMTP_FROM to be set"
            ));
        }
        if s.task_dispatch_mode == TaskDispatchMode::Http && s.task_handler_url.is_none() {
            return Err(anyhow::anyhow!(
                "TASK_DISPATCH_MODE=http requires TASK_HANDLER_URL to be set"
            ));
        }
        if !s.ai_processing_url.starts_with("http://") && !s.ai_processing_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "AI_PROCESSING_URL must start with http:// or https://"
            ));
        }
        if !(s.alert_error_rate_threshold > 0.0 && s.alert_error_rate_threshold <= 1.0) {
            return Err(anyhow::anyhow!(
                "ALERT_ERROR_RATE_THRESHOLD must be in (0, 1]"
            ));
        }
        if self.is_production() && s.cors_origins.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        let env = self.0.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn environment(&self) -> &str {
        &self.0.environment
    }

    pub fn server_port(&self) -> u16 {
        self.0.port
    }

    pub fn database_url(&self) -> Option<&str> {
        self.0.database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.0.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.0.db_timeout_seconds
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.0.storage_backend
    }

    pub fn local_storage_path(&self) -> &str {
        &self.0.local_storage_path
    }

    pub fn storage_bucket_name(&self) -> &str {
        &self.0.storage_bucket_name
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.0.max_file_size_bytes
    }

    pub fn max_files_per_submission(&self) -> usize {
        self.0.max_files_per_submission
    }

    /// Largest multipart body a submission can legitimately produce.
    pub fn max_request_body_bytes(&self) -> usize {
        let files = self.0.max_file_size_bytes as usize * self.0.max_files_per_submission;
        files.saturating_add(1024 * 1024)
    }

    pub fn email_rate_limit(&self) -> u32 {
        self.0.email_rate_limit
    }

    pub fn email_rate_window(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.0.email_rate_window_seconds)
    }

    pub fn ip_rate_limit(&self) -> u32 {
        self.0.ip_rate_limit
    }

    pub fn ip_rate_window(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.0.ip_rate_window_seconds)
    }

    pub fn trusted_proxy_count(&self) -> usize {
        self.0.trusted_proxy_count
    }

    pub fn ai_processing_url(&self) -> &str {
        &self.0.ai_processing_url
    }

    pub fn ai_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.0.ai_timeout_seconds)
    }

    pub fn estimated_completion(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.0.estimated_completion_minutes)
    }

    pub fn estimated_completion_minutes(&self) -> i64 {
        self.0.estimated_completion_minutes
    }

    pub fn task_dispatch_mode(&self) -> TaskDispatchMode {
        self.0.task_dispatch_mode
    }

    pub fn task_handler_url(&self) -> Option<&str> {
        self.0.task_handler_url.as_deref()
    }

    pub fn task_max_workers(&self) -> usize {
        self.0.task_max_workers
    }

    pub fn task_max_retries(&self) -> u32 {
        self.0.task_max_retries
    }

    pub fn smtp_enabled(&self) -> bool {
        self.0.smtp_enabled
    }

    pub fn smtp_host(&self) -> Option<&str> {
        self.0.smtp_host.as_deref()
    }

    pub fn smtp_port(&self) -> u16 {
        self.0.smtp_port
    }

    pub fn smtp_user(&self) -> Option<&str> {
        self.0.smtp_user.as_deref()
    }

    pub fn smtp_password(&self) -> Option<&str> {
        self.0.smtp_password.as_deref()
    }

    pub fn smtp_from(&self) -> Option<&str> {
        self.0.smtp_from.as_deref()
    }

    pub fn smtp_tls(&self) -> bool {
        self.0.smtp_tls
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.0
            .cors_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    pub fn alert_error_rate_threshold(&self) -> f64 {
        self.0.alert_error_rate_threshold
    }

    pub fn alert_max_processing_time_ms(&self) -> u64 {
        self.0.alert_max_processing_time_ms
    }

    pub fn alert_cooldown(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.0.alert_cooldown_seconds)
    }

    pub fn alert_email(&self) -> Option<&str> {
        self.0.alert_email.as_deref()
    }

    pub fn retention_enabled(&self) -> bool {
        self.0.retention_enabled
    }

    pub fn upload_retention_days(&self) -> i64 {
        self.0.upload_retention_days
    }

    pub fn request_retention_days(&self) -> i64 {
        self.0.request_retention_days
    }

    pub fn result_retention_days(&self) -> i64 {
        self.0.result_retention_days
    }
}
