//! Spacing for manual refresh triggers.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Accepts a manual trigger at most once per `window`.
///
/// Only accepted triggers move the window; rejected ones leave it alone.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    last_accepted: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: Mutex::new(None),
        }
    }

    /// Accept a trigger at `now` if the window since the last accepted one has passed.
    pub fn allow(&self, now: Instant) -> bool {
        let mut last = self
            .last_accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let open = match *last {
            None => true,
            Some(prev) => now.saturating_duration_since(prev) >= self.window,
        };
        if open {
            *last = Some(now);
        }
        open
    }
}
