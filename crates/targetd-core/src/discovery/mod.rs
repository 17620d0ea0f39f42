//! Discovery source contract.
//!
//! The refresh core never looks inside a target; it only needs the counts a
//! source reports and an opaque set it can hand back to readers. Backends
//! (a Kubernetes Secret watcher, a local file, a test double) implement
//! [`DiscoverySource`].

mod error;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use error::{DiscoveryError, ErrorCategory};

/// The last successfully discovered collection of publishing targets.
///
/// Replaced wholesale on a successful refresh; never mutated in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetSet {
    entries: Vec<serde_json::Value>,
}

impl TargetSet {
    pub fn new(entries: Vec<serde_json::Value>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[serde_json::Value] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of one successful discovery call.
#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    /// Records found at the source, valid or not.
    pub discovered: usize,
    /// Records the source accepted.
    pub valid: usize,
    /// Records the source rejected.
    pub invalid: usize,
    /// The accepted targets.
    pub targets: TargetSet,
}

impl Discovery {
    /// Discovery where every record was valid.
    pub fn all_valid(targets: TargetSet) -> Self {
        let n = targets.len();
        Self {
            discovered: n,
            valid: n,
            invalid: 0,
            targets,
        }
    }
}

/// Fetches the current publishing targets from an external source.
///
/// Implementations should watch `cancel` during long waits; the executor also
/// races the call against the token and a deadline, so a source that ignores
/// it is still abandoned on shutdown.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    async fn fetch_targets(&self, cancel: &CancellationToken) -> Result<Discovery, DiscoveryError>;
}
