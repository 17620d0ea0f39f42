//! `targetd run` – keep targets fresh until told to stop.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use targetd_core::config::TargetdConfig;
use targetd_core::scheduler::{Refresher, TriggerOutcome};

use crate::cli::event_log::spawn_event_logger;
use crate::cli::file_source::FileDiscovery;
use crate::cli::signals::{wait_for_shutdown_signal, Hangup};

pub async fn run_daemon(cfg: &TargetdConfig, targets: &Path) -> Result<()> {
    let refresh_cfg = cfg.refresh.to_refresh_config()?;
    let source = Arc::new(FileDiscovery::new(targets));
    let refresher = Refresher::new(source, refresh_cfg)?;
    let event_log = spawn_event_logger(refresher.subscribe());

    refresher.start()?;
    tracing::info!(targets = %targets.display(), "targetd running");

    let mut hangup = Hangup::new()?;
    let shutdown = wait_for_shutdown_signal();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            res = &mut shutdown => {
                res?;
                tracing::info!("shutdown signal received");
                break;
            }
            Some(()) = hangup.recv() => match refresher.refresh_now(Instant::now()) {
                TriggerOutcome::Triggered => tracing::info!("SIGHUP: refresh triggered"),
                TriggerOutcome::Rejected(reason) => {
                    tracing::info!("SIGHUP: refresh not started ({:?})", reason)
                }
            },
        }
    }

    let stopped = refresher.stop(cfg.shutdown_timeout()).await;
    let status = refresher.status();
    drop(refresher);
    if let Ok(Ok(totals)) = tokio::time::timeout(Duration::from_secs(1), event_log).await {
        tracing::info!(
            cycles = totals.cycles,
            succeeded = totals.succeeded,
            targets = status.last_outcome.as_ref().map(|o| o.valid_count).unwrap_or(0),
            "targetd stopped"
        );
    }
    stopped?;
    Ok(())
}
