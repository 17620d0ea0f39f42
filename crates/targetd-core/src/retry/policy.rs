use std::time::Duration;

use crate::config::RefreshConfig;

/// Retry classification of a discovery failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Worth retrying within the same cycle (outage, timeout, 5xx).
    Transient,
    /// Retrying will not help until configuration changes (auth, parse).
    Permanent,
}

/// Decision returned by the backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Stop and fold the failure into the cycle outcome.
    GiveUp,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff with a cap, bounded by a number of attempts per cycle.
///
/// `attempt` is 1-based throughout. The first attempt never waits; attempt
/// `n > 1` waits `base * 2^(n-2)`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Discovery calls allowed per cycle (`max_retries` from config).
    pub max_retries: u32,
    /// Delay before the second attempt.
    pub base: Duration,
    /// Upper bound on any single delay.
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&RefreshConfig::default())
    }
}

impl BackoffPolicy {
    pub fn from_config(cfg: &RefreshConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base: cfg.base_backoff,
            max: cfg.max_backoff,
        }
    }

    /// Attempts per cycle. A cycle always makes at least one call, so
    /// `max_retries = 0` behaves like 1.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Wait before attempt number `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exp = (attempt - 2).min(31);
        self.base.saturating_mul(1u32 << exp).min(self.max)
    }

    /// Decide what to do after attempt `attempt` failed with `class`.
    pub fn decide(&self, attempt: u32, class: ErrorClass) -> RetryDecision {
        if class == ErrorClass::Permanent || attempt >= self.max_attempts() {
            return RetryDecision::GiveUp;
        }
        RetryDecision::RetryAfter(self.delay_for(attempt + 1))
    }
}
