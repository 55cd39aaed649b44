use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use feedforward_core::{Config, RateLimitReason, RateLimitRejection};

use super::{FixedWindowLimiter, LimitConfig, LimitDecision, RateLimitError};

/// Gate applied to every submission before anything is stored.
pub trait AdmissionControl: Send + Sync {
    /// Count one submission for both identities.
    ///
    /// An `Err` means the controller itself failed, not that the caller was
    /// rejected; rejection is carried by [`AdmissionDecision::rejection`].
    fn check(&self, email: &str, ip: &str) -> Result<AdmissionDecision, RateLimitError>;
}

/// Outcome of both dimensions for one submission.
#[derive(Debug, Clone)]
pub struct AdmissionDecision {
    pub email: LimitDecision,
    pub ip: LimitDecision,
    email_message: String,
    ip_message: String,
}

impl AdmissionDecision {
    pub fn allowed(&self) -> bool {
        self.email.allowed && self.ip.allowed
    }

    /// Rejection details when either dimension refused. Email wins when both did.
    pub fn rejection(&self) -> Option<RateLimitRejection> {
        let (reason, message) = if !self.email.allowed {
            (RateLimitReason::Email, &self.email_message)
        } else if !self.ip.allowed {
            (RateLimitReason::Ip, &self.ip_message)
        } else {
            return None;
        };

        Some(RateLimitRejection {
            reason,
            message: message.clone(),
            email_limit: self.email.snapshot(),
            ip_limit: self.ip.snapshot(),
        })
    }
}

/// Human wording for a window length, e.g. "hour" or "24 hours".
pub fn describe_window(window: Duration) -> String {
    let secs = window.num_seconds();
    let (amount, unit) = if secs > 0 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs > 0 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if amount == 1 {
        unit.to_string()
    } else {
        format!("{} {}s", amount, unit)
    }
}

pub struct AdmissionController {
    email: FixedWindowLimiter,
    ip: FixedWindowLimiter,
}

impl AdmissionController {
    pub fn new(email: LimitConfig, ip: LimitConfig) -> Self {
        Self {
            email: FixedWindowLimiter::new(email),
            ip: FixedWindowLimiter::new(ip),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let email_window = to_chrono(config.email_rate_window());
        let ip_window = to_chrono(config.ip_rate_window());
        Self::new(
            LimitConfig::new(
                config.email_rate_limit(),
                email_window,
                "email",
                &describe_window(email_window),
            ),
            LimitConfig::new(
                config.ip_rate_limit(),
                ip_window,
                "IP",
                &describe_window(ip_window),
            ),
        )
    }

    /// Both dimensions are always counted, so a rejected IP still uses up an
    /// email slot and vice versa.
    pub fn check_at(
        &self,
        email: &str,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<AdmissionDecision, RateLimitError> {
        let email_decision = self.email.check_limit_at(email, now)?;
        let ip_decision = self.ip.check_limit_at(ip, now)?;

        Ok(AdmissionDecision {
            email: email_decision,
            ip: ip_decision,
            email_message: self.email.config().message.clone(),
            ip_message: self.ip.config().message.clone(),
        })
    }

    pub fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        self.email.cleanup_expired_at(now) + self.ip.cleanup_expired_at(now)
    }

    /// Periodically purge expired entries so idle identities do not pile up.
    pub fn spawn_cleanup(self: Arc<Self>, interval: StdDuration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.cleanup_expired_at(Utc::now());
                if removed > 0 {
                    tracing::debug!(removed = removed, "Purged expired rate limit entries");
                }
            }
        })
    }
}

impl AdmissionControl for AdmissionController {
    fn check(&self, email: &str, ip: &str) -> Result<AdmissionDecision, RateLimitError> {
        self.check_at(email, ip, Utc::now())
    }
}

fn to_chrono(duration: StdDuration) -> Duration {
    Duration::from_std(duration).unwrap_or(Duration::MAX)
}
