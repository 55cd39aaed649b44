use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use feedforward_core::LimitSnapshot;

use super::RateLimitError;

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_at: DateTime<Utc>,
}

impl RateLimitEntry {
    fn first(now: DateTime<Utc>, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: now + window,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.reset_at
    }
}

/// Limit applied to one identity dimension.
#[derive(Debug, Clone)]
pub struct LimitConfig {
    pub limit: u32,
    pub window: Duration,
    /// Message returned to the client when this dimension rejects
    pub message: String,
}

impl LimitConfig {
    /// `label` names the dimension ("email", "IP"), `period` the window in words.
    pub fn new(limit: u32, window: Duration, label: &str, period: &str) -> Self {
        Self {
            limit,
            window,
            message: format!(
                "Rate limit exceeded. Maximum {} submissions per {} per {}.",
                limit, label, period
            ),
        }
    }
}

/// Result of counting one observation against a limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

impl LimitDecision {
    pub fn snapshot(&self) -> LimitSnapshot {
        LimitSnapshot {
            allowed: self.allowed,
            limit: self.limit,
            remaining: self.remaining,
            reset_at: self.reset_at,
        }
    }
}

/// Fixed-window counter keyed by identity.
///
/// Entries live in several shards so that distinct identities rarely contend
/// on the same lock. Expiry is decided by comparing against `reset_at`; the
/// periodic [`cleanup_expired_at`](Self::cleanup_expired_at) sweep only bounds
/// memory.
#[derive(Clone)]
pub struct FixedWindowLimiter {
    shards: Vec<Arc<Mutex<HashMap<String, RateLimitEntry>>>>,
    shard_count: usize,
    config: LimitConfig,
}

impl FixedWindowLimiter {
    pub fn new(config: LimitConfig) -> Self {
        Self::with_shards(config, 16)
    }

    pub fn with_shards(config: LimitConfig, shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        Self {
            shards,
            shard_count,
            config,
        }
    }

    pub fn config(&self) -> &LimitConfig {
        &self.config
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shard_count
    }

    fn lock_shard(
        &self,
        index: usize,
    ) -> Result<MutexGuard<'_, HashMap<String, RateLimitEntry>>, RateLimitError> {
        self.shards[index]
            .lock()
            .map_err(|_| RateLimitError::Poisoned)
    }

    pub fn check_limit(&self, key: &str) -> Result<LimitDecision, RateLimitError> {
        self.check_limit_at(key, Utc::now())
    }

    /// Count one observation for `key` at `now`.
    ///
    /// Once the limit is reached the entry stops counting; repeated rejections
    /// leave both the count and the reset time untouched.
    pub fn check_limit_at(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<LimitDecision, RateLimitError> {
        let limit = self.config.limit;
        let mut entries = self.lock_shard(self.shard_index(key))?;

        let entry = match entries.get_mut(key) {
            Some(entry) if !entry.is_expired(now) => entry,
            _ => {
                let entry = RateLimitEntry::first(now, self.config.window);
                entries.insert(key.to_string(), entry);
                tracing::trace!(key = %key, "Rate limit window opened");
                return Ok(LimitDecision {
                    allowed: true,
                    limit,
                    remaining: limit.saturating_sub(1),
                    reset_at: entry.reset_at,
                });
            }
        };

        if entry.count >= limit {
            tracing::debug!(
                key = %key,
                count = entry.count,
                reset_at = %entry.reset_at,
                "Rate limit exceeded"
            );
            return Ok(LimitDecision {
                allowed: false,
                limit,
                remaining: 0,
                reset_at: entry.reset_at,
            });
        }

        entry.count += 1;
        Ok(LimitDecision {
            allowed: true,
            limit,
            remaining: limit - entry.count,
            reset_at: entry.reset_at,
        })
    }

    /// Current state for `key` without counting an observation.
    pub fn peek_at(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<LimitDecision, RateLimitError> {
        let limit = self.config.limit;
        let entries = self.lock_shard(self.shard_index(key))?;
        let decision = match entries.get(key).filter(|e| !e.is_expired(now)) {
            Some(entry) => LimitDecision {
                allowed: entry.count < limit,
                limit,
                remaining: limit.saturating_sub(entry.count),
                reset_at: entry.reset_at,
            },
            None => LimitDecision {
                allowed: true,
                limit,
                remaining: limit,
                reset_at: now + self.config.window,
            },
        };
        Ok(decision)
    }

    /// Drop every entry whose window has ended. Returns how many were removed.
    pub fn cleanup_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let mut entries = shard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now));
            removed += before - entries.len();
        }
        removed
    }

    /// Number of tracked identities, expired or not.
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .len()
            })
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(limit: u32, window_secs: i64) -> FixedWindowLimiter {
        FixedWindowLimiter::new(LimitConfig::new(
            limit,
            Duration::seconds(window_secs),
            "email",
            "24 hours",
        ))
    }

    #[test]
    fn test_first_observation_opens_window() {
        let limiter = limiter(3, 60);
        let now = Utc::now();
        let decision = limiter.check_limit_at("a@b.com", now).unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
        assert_eq!(decision.reset_at, now + Duration::seconds(60));
    }

    #[test]
    fn test_rejects_after_limit_and_saturates() {
        let limiter = limiter(3, 60);
        let now = Utc::now();
        for expected_remaining in [2, 1, 0] {
            let d = limiter.check_limit_at("a@b.com", now).unwrap();
            assert!(d.allowed);
            assert_eq!(d.remaining, expected_remaining);
        }

        let later = now + Duration::seconds(10);
        let fourth = limiter.check_limit_at("a@b.com", later).unwrap();
        let fifth = limiter.check_limit_at("a@b.com", later).unwrap();
        assert!(!fourth.allowed);
        assert_eq!(fourth.remaining, 0);
        assert_eq!(fourth, fifth);
        assert_eq!(fourth.reset_at, now + Duration::seconds(60));
    }

    #[test]
    fn test_window_resets_exactly_at_reset_time() {
        let limiter = limiter(1, 60);
        let now = Utc::now();
        assert!(limiter.check_limit_at("k", now).unwrap().allowed);
        assert!(!limiter.check_limit_at("k", now + Duration::seconds(59)).unwrap().allowed);

        let reopened = limiter.check_limit_at("k", now + Duration::seconds(60)).unwrap();
        assert!(reopened.allowed);
        assert_eq!(reopened.reset_at, now + Duration::seconds(120));
    }

    #[test]
    fn test_identities_are_independent() {
        let limiter = limiter(1, 60);
        let now = Utc::now();
        assert!(limiter.check_limit_at("one", now).unwrap().allowed);
        assert!(limiter.check_limit_at("two", now).unwrap().allowed);
        assert!(!limiter.check_limit_at("one", now).unwrap().allowed);
    }

    #[test]
    fn test_peek_does_not_count() {
        let limiter = limiter(2, 60);
        let now = Utc::now();
        limiter.check_limit_at("k", now).unwrap();
        let peeked = limiter.peek_at("k", now).unwrap();
        assert_eq!(peeked.remaining, 1);
        assert_eq!(limiter.peek_at("k", now).unwrap(), peeked);
    }

    #[test]
    fn test_cleanup_removes_only_expired() {
        let limiter = FixedWindowLimiter::with_shards(
            LimitConfig::new(5, Duration::seconds(60), "IP", "hour"),
            1,
        );
        let now = Utc::now();
        limiter.check_limit_at("old", now).unwrap();
        limiter
            .check_limit_at("new", now + Duration::seconds(30))
            .unwrap();

        let removed = limiter.cleanup_expired_at(now + Duration::seconds(61));
        assert_eq!(removed, 1);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn test_message_names_limit_and_period() {
        let config = LimitConfig::new(5, Duration::hours(1), "IP", "hour");
        assert_eq!(
            config.message,
            "Rate limit exceeded. Maximum 5 submissions per IP per hour."
        );
    }
}
