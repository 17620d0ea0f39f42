//! Background schedule loop and the shared per-cycle wrapper.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{sleep_until, Instant};

use crate::refresh::{RefreshEvent, RefreshOutcome, RefreshPermit, Trigger};

use super::refresher::Shared;

/// Wall-clock time `d` from now, if representable.
pub(super) fn wall_clock_after(d: Duration) -> Option<DateTime<Utc>> {
    let d = chrono::Duration::from_std(d).ok()?;
    Utc::now().checked_add_signed(d)
}

/// Run one admitted cycle, release the permit, then report it.
pub(super) async fn run_cycle(shared: &Shared, permit: RefreshPermit, trigger: Trigger) -> RefreshOutcome {
    let outcome = shared.executor.execute(&shared.shutdown).await;
    drop(permit);

    let trigger_name = trigger.as_str();
    if outcome.succeeded {
        tracing::info!(
            trigger = trigger_name,
            attempts = outcome.attempts,
            discovered = outcome.discovered_count,
            valid = outcome.valid_count,
            invalid = outcome.invalid_count,
            duration_ms = outcome.duration.as_millis() as u64,
            "targets refreshed"
        );
    } else if outcome.was_cancelled() {
        tracing::info!(trigger = trigger_name, "refresh cancelled by shutdown");
    } else if let Some(err) = &outcome.last_error {
        tracing::warn!(
            trigger = trigger_name,
            attempts = outcome.attempts,
            consecutive_failures = outcome.consecutive_failures,
            class = ?err.class,
            category = %err.category,
            error = %err.message,
            "refresh failed; keeping previous targets"
        );
    }

    shared.events.publish(RefreshEvent {
        trigger,
        outcome: outcome.clone(),
    });
    outcome
}

/// First interval boundary `origin + k * interval` (k >= 1) strictly after `now`.
///
/// `None` when that boundary cannot be represented; the loop then only waits
/// for shutdown.
pub(super) fn next_boundary(origin: Instant, interval: Duration, now: Instant) -> Option<Instant> {
    let elapsed = now.saturating_duration_since(origin).as_nanos();
    let k = u32::try_from(elapsed / interval.as_nanos() + 1).ok()?;
    origin.checked_add(interval.checked_mul(k)?)
}

fn publish_next(shared: &Shared, next: Option<Instant>) {
    let at = next.and_then(|at| wall_clock_after(at.saturating_duration_since(Instant::now())));
    shared.store.set_next_scheduled(at);
}

/// Scheduled refreshes: first tick after the warmup period, then on every
/// interval boundary measured from that first tick.
///
/// A boundary that passes while a cycle is running, scheduled or manual, is
/// skipped; the loop resumes at the first boundary after the cycle ends.
pub(super) async fn run_schedule(shared: Arc<Shared>) {
    let cfg = shared.config;
    let Some(origin) = Instant::now().checked_add(cfg.warmup_period) else {
        tracing::warn!("first scheduled refresh is out of range; waiting for shutdown");
        shared.shutdown.cancelled().await;
        return;
    };
    let mut next = Some(origin);

    loop {
        let Some(deadline) = next else {
            tracing::warn!("next scheduled refresh is out of range; waiting for shutdown");
            shared.shutdown.cancelled().await;
            return;
        };
        tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => {
                tracing::debug!("refresh scheduler loop exiting");
                return;
            }
            _ = sleep_until(deadline) => {}
        }

        publish_next(&shared, next_boundary(origin, cfg.interval, Instant::now()));
        match shared.coordinator.try_start() {
            Ok(permit) => {
                run_cycle(&shared, permit, Trigger::Scheduled).await;
            }
            Err(busy) => {
                tracing::debug!("scheduled refresh skipped: {}", busy);
            }
        }

        next = next_boundary(origin, cfg.interval, Instant::now());
        if shared.shutdown.is_cancelled() {
            return;
        }
        publish_next(&shared, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn boundary_is_strictly_after_now() {
        let origin = Instant::now();
        let interval = secs(60);
        assert_eq!(next_boundary(origin, interval, origin), Some(origin + secs(60)));
        assert_eq!(next_boundary(origin, interval, origin + secs(59)), Some(origin + secs(60)));
        assert_eq!(next_boundary(origin, interval, origin + secs(60)), Some(origin + secs(120)));
        assert_eq!(next_boundary(origin, interval, origin + secs(100)), Some(origin + secs(120)));
    }

    #[test]
    fn overrun_of_several_intervals_skips_them_all() {
        let origin = Instant::now();
        let next = next_boundary(origin, secs(60), origin + secs(450));
        assert_eq!(next, Some(origin + secs(480)));
    }

    #[test]
    fn unrepresentable_boundary_is_none() {
        let origin = Instant::now();
        assert_eq!(next_boundary(origin, Duration::MAX, origin), None);
    }
}
