//! Scripted discovery sources shared by integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use targetd_core::discovery::{
    Discovery, DiscoveryError, DiscoverySource, ErrorCategory, TargetSet,
};
use tokio_util::sync::CancellationToken;

pub fn targets(names: &[&str]) -> Discovery {
    let entries = names
        .iter()
        .map(|n| serde_json::json!({ "name": n }))
        .collect();
    Discovery::all_valid(TargetSet::new(entries))
}

pub fn transient() -> DiscoveryError {
    DiscoveryError::new(ErrorCategory::Server, "503 from api server")
}

pub fn permanent() -> DiscoveryError {
    DiscoveryError::new(ErrorCategory::Forbidden, "secrets is forbidden")
}

/// Plays back scripted results (then `fallback` forever), taking `delay` per call.
pub struct ScriptedSource {
    script: Mutex<VecDeque<Result<Discovery, DiscoveryError>>>,
    fallback: Result<Discovery, DiscoveryError>,
    delay: Duration,
    calls: AtomicU32,
}

impl ScriptedSource {
    pub fn new(
        script: Vec<Result<Discovery, DiscoveryError>>,
        fallback: Result<Discovery, DiscoveryError>,
    ) -> Arc<Self> {
        Self::with_delay(script, fallback, Duration::ZERO)
    }

    pub fn with_delay(
        script: Vec<Result<Discovery, DiscoveryError>>,
        fallback: Result<Discovery, DiscoveryError>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            delay,
            calls: AtomicU32::new(0),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiscoverySource for ScriptedSource {
    async fn fetch_targets(&self, _cancel: &CancellationToken) -> Result<Discovery, DiscoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

/// Never answers and ignores cancellation.
pub struct HangingSource;

#[async_trait]
impl DiscoverySource for HangingSource {
    async fn fetch_targets(&self, _cancel: &CancellationToken) -> Result<Discovery, DiscoveryError> {
        std::future::pending().await
    }
}

/// Blocks its worker thread for the given time; cannot be interrupted at all.
pub struct BlockingSource(pub Duration);

#[async_trait]
impl DiscoverySource for BlockingSource {
    async fn fetch_targets(&self, _cancel: &CancellationToken) -> Result<Discovery, DiscoveryError> {
        std::thread::sleep(self.0);
        Ok(targets(&["late"]))
    }
}
