//! Renders refresh outcome events as log lines with running totals.
//!
//! Stands in for a metrics exporter: the same counters a dashboard would
//! scrape are kept here and emitted under the `targetd::metrics` target.

use targetd_core::refresh::RefreshEvent;
use targetd_core::retry::ErrorClass;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Running totals across refresh cycles.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventTotals {
    pub cycles: u64,
    pub succeeded: u64,
    pub transient_failures: u64,
    pub permanent_failures: u64,
    pub cancelled: u64,
    /// Gauge: failures since the last success.
    pub consecutive_failures: u32,
}

impl EventTotals {
    pub fn record(&mut self, ev: &RefreshEvent) {
        self.cycles += 1;
        self.consecutive_failures = ev.outcome.consecutive_failures;
        if ev.succeeded() {
            self.succeeded += 1;
        } else if ev.outcome.was_cancelled() {
            self.cancelled += 1;
        } else {
            match ev.error_class() {
                Some(ErrorClass::Permanent) => self.permanent_failures += 1,
                Some(ErrorClass::Transient) | None => self.transient_failures += 1,
            }
        }
    }
}

pub fn spawn_event_logger(mut rx: broadcast::Receiver<RefreshEvent>) -> JoinHandle<EventTotals> {
    tokio::spawn(async move {
        let mut totals = EventTotals::default();
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    totals.record(&ev);
                    tracing::info!(
                        target: "targetd::metrics",
                        trigger = ev.trigger.as_str(),
                        succeeded = ev.succeeded(),
                        duration_ms = ev.duration().as_millis() as u64,
                        error_class = ?ev.error_class(),
                        cycles_total = totals.cycles,
                        failures_total = totals.transient_failures + totals.permanent_failures,
                        consecutive_failures = totals.consecutive_failures,
                        "refresh cycle"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(target: "targetd::metrics", skipped, "event log fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
        totals
    })
}
