//! Fixed-window request limiter keyed by client and route

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// How many requests a key may make per window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub limit: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window }
    }

    pub const fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(100, Duration::from_secs(15 * 60))
    }
}

/// Outcome of a single [`RateLimiter::check`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    /// Time until the current window resets
    pub retry_after: Duration,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// `Retry-After` value in whole seconds, rounded up
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        if self.retry_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

struct Window {
    count: u32,
    resets_at: Instant,
}

#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<DashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request against `key`
    pub fn check(&self, key: &str, policy: RateLimitPolicy) -> RateLimitDecision {
        let now = Instant::now();
        let limit = policy.limit.max(1);

        let mut window = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Window {
                count: 0,
                resets_at: now + policy.window,
            });

        if now > window.resets_at {
            window.count = 0;
            window.resets_at = now + policy.window;
        }

        let retry_after = window.resets_at.saturating_duration_since(now);
        let reset_at = Utc::now()
            + chrono::Duration::from_std(retry_after).unwrap_or_else(|_| chrono::Duration::zero());

        if window.count >= limit {
            debug!("Rate limit exceeded for {}", key);
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after,
                reset_at,
            };
        }

        window.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: limit - window.count,
            retry_after,
            reset_at,
        }
    }

    /// Drop windows that have already ended
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| now <= window.resets_at);
        before - self.windows.len()
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn start_cleanup_task(&self, every: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = limiter.purge_expired();
                if removed > 0 {
                    debug!("Purged {} expired rate limit windows", removed);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_limit_then_reset() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::new(3, Duration::from_secs(60));

        for expected_remaining in [2, 1, 0] {
            let decision = limiter.check("1.2.3.4:/scores", policy);
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let denied = limiter.check("1.2.3.4:/scores", policy);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.retry_after_secs(), 60);

        tokio::time::advance(Duration::from_secs(61)).await;

        let decision = limiter.check("1.2.3.4:/scores", policy);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::per_minute(1);

        assert!(limiter.check("a:/stream", policy).allowed);
        assert!(!limiter.check("a:/stream", policy).allowed);
        assert!(limiter.check("b:/stream", policy).allowed);
        assert!(limiter.check("a:/scoreboard", policy).allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let limiter = RateLimiter::new();
        limiter.check("short", RateLimitPolicy::new(5, Duration::from_secs(1)));
        limiter.check("long", RateLimitPolicy::new(5, Duration::from_secs(600)));
        assert_eq!(limiter.len(), 2);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(limiter.purge_expired(), 1);
        assert_eq!(limiter.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_purges() {
        let limiter = RateLimiter::new();
        limiter.check("k", RateLimitPolicy::new(5, Duration::from_secs(1)));

        let handle = limiter.start_cleanup_task(Duration::from_secs(10));
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert!(limiter.is_empty());
        handle.abort();
    }

    #[test]
    fn test_retry_after_rounds_up() {
        let decision = RateLimitDecision {
            allowed: false,
            remaining: 0,
            retry_after: Duration::from_millis(1500),
            reset_at: Utc::now(),
        };
        assert_eq!(decision.retry_after_secs(), 2);
    }
}
