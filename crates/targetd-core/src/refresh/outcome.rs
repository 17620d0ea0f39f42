//! Outcome of a refresh cycle and the externally visible status snapshot.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::discovery::{DiscoveryError, ErrorCategory};
use crate::retry::{classify, ErrorClass};

fn serialize_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Last failure of a cycle, as reported to status readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshError {
    pub class: ErrorClass,
    pub category: ErrorCategory,
    pub message: String,
}

impl From<&DiscoveryError> for RefreshError {
    fn from(e: &DiscoveryError) -> Self {
        Self {
            class: classify(e),
            category: e.category,
            message: e.message.clone(),
        }
    }
}

/// Result of one refresh cycle (all attempts included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub succeeded: bool,
    /// Discovery calls made during the cycle.
    pub attempts: u32,
    pub discovered_count: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub consecutive_failures: u32,
    pub last_error: Option<RefreshError>,
}

impl RefreshOutcome {
    /// True when the cycle was interrupted by shutdown rather than failing.
    pub fn was_cancelled(&self) -> bool {
        matches!(
            self.last_error,
            Some(RefreshError {
                category: ErrorCategory::Cancelled,
                ..
            })
        )
    }
}

/// Snapshot of refresher state. Replaced whole on every write, never edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RefreshStatus {
    pub in_progress: bool,
    /// When the most recent cycle finished, successful or not.
    pub last_refresh: Option<DateTime<Utc>>,
    /// When the target set was last replaced.
    pub last_success: Option<DateTime<Utc>>,
    pub next_scheduled_refresh: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub last_outcome: Option<RefreshOutcome>,
}

impl RefreshStatus {
    pub fn succeeded(&self) -> Option<bool> {
        self.last_outcome.as_ref().map(|o| o.succeeded)
    }

    pub fn last_error(&self) -> Option<&RefreshError> {
        self.last_outcome.as_ref().and_then(|o| o.last_error.as_ref())
    }
}
