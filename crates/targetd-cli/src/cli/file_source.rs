//! Discovery source backed by a local JSON file.
//!
//! The file holds an array of target records. Records that are objects with a
//! non-empty string `name` are counted valid; everything else is invalid.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use targetd_core::discovery::{Discovery, DiscoveryError, DiscoverySource, ErrorCategory, TargetSet};
use tokio_util::sync::CancellationToken;

pub struct FileDiscovery {
    path: PathBuf,
}

impl FileDiscovery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn with_path(&self, e: DiscoveryError) -> DiscoveryError {
        DiscoveryError::new(e.category, format!("{}: {}", self.path.display(), e.message))
    }
}

fn is_target(record: &Value) -> bool {
    record
        .get("name")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.is_empty())
}

fn summarize(records: Vec<Value>) -> Discovery {
    let discovered = records.len();
    let valid: Vec<Value> = records.into_iter().filter(is_target).collect();
    Discovery {
        discovered,
        valid: valid.len(),
        invalid: discovered - valid.len(),
        targets: TargetSet::new(valid),
    }
}

#[async_trait]
impl DiscoverySource for FileDiscovery {
    async fn fetch_targets(&self, _cancel: &CancellationToken) -> Result<Discovery, DiscoveryError> {
        // A missing file maps to Connection: the mount may not be populated yet.
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| self.with_path(e.into()))?;
        let value: Value = serde_json::from_slice(&bytes).map_err(|e| self.with_path(e.into()))?;
        let Value::Array(records) = value else {
            return Err(self.with_path(DiscoveryError::new(
                ErrorCategory::Malformed,
                "expected a JSON array of targets",
            )));
        };
        Ok(summarize(records))
    }
}
