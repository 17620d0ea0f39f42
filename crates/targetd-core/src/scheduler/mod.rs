//! Refresh scheduler.
//!
//! [`Refresher`] owns the coordinator, executor, status store and rate
//! limiter for one discovery source. It runs scheduled refreshes on a
//! background task (warmup, then fixed interval), accepts rate-limited manual
//! triggers, and shuts down cooperatively through a cancellation token.

mod refresher;
mod run;

pub use refresher::{RejectReason, Refresher, RefresherError, TriggerOutcome};
