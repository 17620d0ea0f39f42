//! `targetd once` – run one refresh cycle and print the status.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use targetd_core::config::TargetdConfig;
use targetd_core::scheduler::{Refresher, TriggerOutcome};

use crate::cli::file_source::FileDiscovery;
use crate::cli::signals::wait_for_shutdown_signal;

pub async fn run_once(cfg: &TargetdConfig, targets: &Path) -> Result<()> {
    let refresh_cfg = cfg.refresh.to_refresh_config()?;
    let refresher = Refresher::new(Arc::new(FileDiscovery::new(targets)), refresh_cfg)?;
    let mut events = refresher.subscribe();

    if let TriggerOutcome::Rejected(reason) = refresher.refresh_now(Instant::now()) {
        anyhow::bail!("refresh not started: {:?}", reason);
    }

    let event = tokio::select! {
        ev = events.recv() => ev?,
        res = wait_for_shutdown_signal() => {
            res?;
            refresher.stop(cfg.shutdown_timeout()).await?;
            anyhow::bail!("interrupted");
        }
    };

    println!("{}", serde_json::to_string_pretty(&refresher.status())?);
    if !event.succeeded() {
        anyhow::bail!("refresh failed after {} attempt(s)", event.outcome.attempts);
    }
    Ok(())
}
