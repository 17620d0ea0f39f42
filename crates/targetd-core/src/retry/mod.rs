//! Retry and backoff policy.
//!
//! This module encapsulates error classification (transient vs permanent
//! discovery failures) and exponential backoff decisions so the refresh
//! executor applies one consistent policy per cycle.

mod classify;
mod policy;

pub use classify::{category_for_http_status, classify, classify_category};
pub use policy::{BackoffPolicy, ErrorClass, RetryDecision};
