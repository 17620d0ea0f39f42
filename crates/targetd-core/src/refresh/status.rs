//! Status store: status and target set published together as one snapshot.
//!
//! Readers clone an `Arc` under a read lock held only for that clone, so a
//! status read never waits on a discovery call. Writers serialize on a
//! separate mutex and publish by replacing the whole snapshot, so a reader
//! never pairs a new target set with an old status.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use crate::discovery::TargetSet;

use super::outcome::{RefreshOutcome, RefreshStatus};

/// One published state: the status and the targets it describes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub status: RefreshStatus,
    pub targets: Arc<TargetSet>,
}

#[derive(Debug, Default)]
pub struct StatusStore {
    current: RwLock<Arc<Snapshot>>,
    writer: Mutex<()>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Last successfully discovered targets (empty until the first success).
    pub fn targets(&self) -> Arc<TargetSet> {
        Arc::clone(&self.load().targets)
    }

    fn swap(&self, next: Snapshot) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }

    /// Publish the outcome of a finished cycle.
    ///
    /// `build` sees the previous status (for failure counting) and returns
    /// the outcome plus, on success only, the replacement target set.
    pub fn commit<F>(&self, build: F) -> RefreshOutcome
    where
        F: FnOnce(&RefreshStatus) -> (RefreshOutcome, Option<TargetSet>),
    {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let prev = self.load();
        let (outcome, targets) = build(&prev.status);

        let targets = match targets {
            Some(t) => Arc::new(t),
            None => Arc::clone(&prev.targets),
        };
        let last_success = if outcome.succeeded {
            Some(outcome.finished_at)
        } else {
            prev.status.last_success
        };
        self.swap(Snapshot {
            status: RefreshStatus {
                in_progress: false,
                last_refresh: Some(outcome.finished_at),
                last_success,
                next_scheduled_refresh: prev.status.next_scheduled_refresh,
                consecutive_failures: outcome.consecutive_failures,
                last_outcome: Some(outcome.clone()),
            },
            targets,
        });
        outcome
    }

    /// Record when the scheduler will fire next; `None` when nothing is scheduled.
    pub fn set_next_scheduled(&self, at: Option<DateTime<Utc>>) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = (*self.load()).clone();
        next.status.next_scheduled_refresh = at;
        self.swap(next);
    }
}
