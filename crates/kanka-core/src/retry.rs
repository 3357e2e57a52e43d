//! Rate-limit retry policy.
//!
//! Only HTTP 429 is ever retried. Every other error status, and every
//! transport failure, goes straight back to the caller.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::transport::HttpResponse;

/// How rate-limited requests are retried.
///
/// # Example
///
/// ```
/// use kanka_core::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default()
///     .with_max_retries(3)
///     .with_initial_delay(Duration::from_millis(500))
///     .with_max_delay(Duration::from_secs(10));
/// assert!(policy.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Whether 429 responses are retried at all.
    pub enabled: bool,
    /// Consecutive 429 responses tolerated; the one that reaches this count
    /// is returned as an error and nothing more is sent.
    pub max_retries: u32,
    /// First fallback delay when the server gives no hint.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 8,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that surfaces the first 429 immediately.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }
}

/// Rate-limit hints read from a 429 response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitHints {
    /// `Retry-After`, as a delay.
    pub retry_after: Option<Duration>,
    /// `X-RateLimit-Remaining`.
    pub remaining: Option<u64>,
    /// `X-RateLimit-Reset`, as a point in time.
    pub reset: Option<DateTime<Utc>>,
}

impl RateLimitHints {
    /// Reads the hints from response headers. `now` resolves an HTTP-date
    /// `Retry-After`.
    pub fn from_response(response: &HttpResponse, now: DateTime<Utc>) -> Self {
        Self {
            retry_after: response
                .header("retry-after")
                .and_then(|value| parse_retry_after(value, now)),
            remaining: response
                .header("x-ratelimit-remaining")
                .and_then(|value| value.trim().parse().ok()),
            reset: response
                .header("x-ratelimit-reset")
                .and_then(|value| value.trim().parse::<i64>().ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        }
    }
}

/// What to do after a 429.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the duration, then send again.
    Retry(Duration),
    /// Surface the rate-limit error.
    GiveUp,
}

/// Retry bookkeeping for one logical request.
#[derive(Debug, Clone)]
pub struct RetryState {
    attempts: u32,
    current_delay: Duration,
    policy: RetryPolicy,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempts: 0,
            current_delay: policy.initial_delay,
            policy: policy.clone(),
        }
    }

    /// Number of 429 responses seen so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Records a 429 and decides whether to try again.
    ///
    /// The delay is `Retry-After` when present; otherwise the time until
    /// `X-RateLimit-Reset` when `X-RateLimit-Remaining` is 0; otherwise the
    /// fallback delay, which starts at the initial delay and doubles on
    /// every retry. The result never exceeds the policy's max delay.
    pub fn on_rate_limited(&mut self, hints: &RateLimitHints, now: DateTime<Utc>) -> RetryDecision {
        self.attempts += 1;

        if !self.policy.enabled || self.attempts >= self.policy.max_retries {
            return RetryDecision::GiveUp;
        }

        let fallback = self.current_delay;
        self.current_delay = self
            .current_delay
            .saturating_mul(2)
            .min(self.policy.max_delay);

        let delay = match (hints.retry_after, hints.remaining, hints.reset) {
            (Some(retry_after), _, _) => retry_after,
            (None, Some(0), Some(reset)) => (reset - now).to_std().unwrap_or(Duration::ZERO),
            _ => fallback,
        };

        RetryDecision::Retry(delay.min(self.policy.max_delay))
    }
}

/// Parses a `Retry-After` value: delay-seconds or an HTTP-date.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    if let Ok(seconds) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(seconds).ok();
    }
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|date| (date.with_timezone(&Utc) - now).to_std().unwrap_or(Duration::ZERO))
}
