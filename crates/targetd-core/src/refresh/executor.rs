//! One refresh cycle: fetch, retry transient failures with backoff, commit once.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::discovery::{Discovery, DiscoveryError, DiscoverySource};
use crate::retry::{classify, BackoffPolicy, RetryDecision};

use super::outcome::{RefreshError, RefreshOutcome};
use super::status::StatusStore;

/// Runs refresh cycles against a discovery source and publishes to the store.
///
/// The executor does not enforce single-flight itself; callers hold a
/// [`RefreshPermit`](super::RefreshPermit) while calling [`execute`](Self::execute).
pub struct RefreshExecutor {
    source: Arc<dyn DiscoverySource>,
    policy: BackoffPolicy,
    refresh_timeout: Duration,
    store: Arc<StatusStore>,
}

/// Start time of a cycle on both clocks.
struct CycleClock {
    started_at: DateTime<Utc>,
    start: Instant,
}

impl CycleClock {
    fn start() -> Self {
        Self {
            started_at: Utc::now(),
            start: Instant::now(),
        }
    }
}

enum CycleEnd {
    Success(Discovery),
    Failure(DiscoveryError),
    Cancelled,
}

impl RefreshExecutor {
    pub fn new(
        source: Arc<dyn DiscoverySource>,
        policy: BackoffPolicy,
        refresh_timeout: Duration,
        store: Arc<StatusStore>,
    ) -> Self {
        Self {
            source,
            policy,
            refresh_timeout,
            store,
        }
    }

    /// Run one cycle and publish its outcome.
    ///
    /// Discovery failures never escape: they are retried or folded into the
    /// returned outcome. The target set is replaced only on success.
    pub async fn execute(&self, cancel: &CancellationToken) -> RefreshOutcome {
        let clock = CycleClock::start();
        let mut attempt = 1u32;
        let end = loop {
            let err = match self.fetch_once(cancel).await {
                Ok(discovery) => break CycleEnd::Success(discovery),
                Err(_) if cancel.is_cancelled() => break CycleEnd::Cancelled,
                Err(e) => e,
            };
            match self.policy.decide(attempt, classify(&err)) {
                RetryDecision::GiveUp => break CycleEnd::Failure(err),
                RetryDecision::RetryAfter(delay) => {
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "discovery attempt failed; backing off"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break CycleEnd::Cancelled,
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        };
        self.commit(clock, attempt, end)
    }

    /// One discovery call under the refresh deadline, abandoned on cancellation.
    async fn fetch_once(&self, cancel: &CancellationToken) -> Result<Discovery, DiscoveryError> {
        if cancel.is_cancelled() {
            return Err(DiscoveryError::cancelled());
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DiscoveryError::cancelled()),
            res = tokio::time::timeout(self.refresh_timeout, self.source.fetch_targets(cancel)) => {
                res.unwrap_or_else(|_| Err(DiscoveryError::timeout(self.refresh_timeout)))
            }
        }
    }

    fn commit(&self, clock: CycleClock, attempts: u32, end: CycleEnd) -> RefreshOutcome {
        let duration = clock.start.elapsed();
        let finished_at = Utc::now();
        self.store.commit(|prev| {
            let mut outcome = RefreshOutcome {
                started_at: clock.started_at,
                finished_at,
                duration,
                succeeded: false,
                attempts,
                discovered_count: 0,
                valid_count: 0,
                invalid_count: 0,
                consecutive_failures: prev.consecutive_failures,
                last_error: None,
            };
            match end {
                CycleEnd::Success(d) => {
                    outcome.succeeded = true;
                    outcome.discovered_count = d.discovered;
                    outcome.valid_count = d.valid;
                    outcome.invalid_count = d.invalid;
                    outcome.consecutive_failures = 0;
                    (outcome, Some(d.targets))
                }
                CycleEnd::Failure(e) => {
                    outcome.consecutive_failures = prev.consecutive_failures.saturating_add(1);
                    outcome.last_error = Some(RefreshError::from(&e));
                    (outcome, None)
                }
                CycleEnd::Cancelled => {
                    outcome.last_error = Some(RefreshError::from(&DiscoveryError::cancelled()));
                    (outcome, None)
                }
            }
        })
    }
}
