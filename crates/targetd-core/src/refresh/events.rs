//! Per-cycle outcome events for observers (metrics, logs).
//!
//! Thin wrapper over [`tokio::sync::broadcast`]: publishing never blocks, a
//! receiver only sees events sent after it subscribed, and slow receivers get
//! `RecvError::Lagged` and skip the oldest events.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::retry::ErrorClass;

use super::outcome::RefreshOutcome;

/// What started a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Scheduled => "scheduled",
            Trigger::Manual => "manual",
        }
    }
}

/// One finished refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshEvent {
    pub trigger: Trigger,
    pub outcome: RefreshOutcome,
}

impl RefreshEvent {
    pub fn succeeded(&self) -> bool {
        self.outcome.succeeded
    }

    pub fn duration(&self) -> Duration {
        self.outcome.duration
    }

    /// Class of the failure that ended the cycle, if it failed.
    pub fn error_class(&self) -> Option<ErrorClass> {
        self.outcome.last_error.as_ref().map(|e| e.class)
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RefreshEvent>,
}

impl EventBus {
    /// Capacity is shared by all receivers; minimum 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Events are dropped when nobody is subscribed.
    pub fn publish(&self, ev: RefreshEvent) {
        let _ = self.tx.send(ev);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
