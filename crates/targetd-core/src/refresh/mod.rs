//! Refresh building blocks.
//!
//! - [`RefreshCoordinator`]: single-flight admission (reject on contention)
//! - [`RateLimiter`]: spacing for manual triggers
//! - [`StatusStore`]: status and target set published as one snapshot
//! - [`RefreshExecutor`]: one cycle of fetch / retry / commit
//! - [`EventBus`]: per-cycle outcome events for observers
//!
//! The [`Refresher`](crate::scheduler::Refresher) wires these together.

mod coordinator;
mod events;
mod executor;
mod outcome;
mod rate_limit;
mod status;

pub use coordinator::{Busy, RefreshCoordinator, RefreshPermit};
pub use events::{EventBus, RefreshEvent, Trigger};
pub use executor::RefreshExecutor;
pub use outcome::{RefreshError, RefreshOutcome, RefreshStatus};
pub use rate_limit::RateLimiter;
pub use status::{Snapshot, StatusStore};
