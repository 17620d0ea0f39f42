//! Refresher: owned lifecycle around coordinator, executor, store and limiter.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigError, RefreshConfig};
use crate::discovery::{DiscoverySource, TargetSet};
use crate::refresh::{
    EventBus, RateLimiter, RefreshCoordinator, RefreshEvent, RefreshExecutor, RefreshStatus,
    StatusStore, Trigger,
};
use crate::retry::BackoffPolicy;

use super::run::{run_cycle, run_schedule, wall_clock_after};

/// Lifecycle errors returned by [`Refresher::start`] and [`Refresher::stop`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefresherError {
    #[error("refresher already started")]
    AlreadyStarted,
    #[error("shutdown did not complete within {0:?}; in-flight refresh abandoned")]
    ShutdownTimeout(Duration),
}

/// Why a manual refresh was not started. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A manual refresh was accepted less than `rate_limit_window` ago.
    RateLimited,
    /// A refresh is already running.
    Busy,
    /// The refresher has been stopped.
    Stopped,
}

/// Result of [`Refresher::refresh_now`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A refresh was started in the background.
    Triggered,
    Rejected(RejectReason),
}

/// State shared with background tasks.
pub(super) struct Shared {
    pub(super) config: RefreshConfig,
    pub(super) executor: RefreshExecutor,
    pub(super) coordinator: Arc<RefreshCoordinator>,
    pub(super) store: Arc<StatusStore>,
    pub(super) limiter: RateLimiter,
    pub(super) events: EventBus,
    pub(super) shutdown: CancellationToken,
}

enum Lifecycle {
    Idle,
    Running(JoinHandle<()>),
    Stopped,
}

/// Keeps a target set fresh from a discovery source.
///
/// Build one per process and share it by `Arc`. `start`, `refresh_now` and
/// `stop` must be called from within a tokio runtime.
pub struct Refresher {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
    manual: Mutex<Option<JoinHandle<()>>>,
}

impl Refresher {
    /// Validate `config` and build an idle refresher.
    pub fn new(source: Arc<dyn DiscoverySource>, config: RefreshConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = Arc::new(StatusStore::new());
        let executor = RefreshExecutor::new(
            source,
            BackoffPolicy::from_config(&config),
            config.refresh_timeout,
            Arc::clone(&store),
        );
        Ok(Self {
            shared: Arc::new(Shared {
                config,
                executor,
                coordinator: Arc::new(RefreshCoordinator::new()),
                store,
                limiter: RateLimiter::new(config.rate_limit_window),
                events: EventBus::default(),
                shutdown: CancellationToken::new(),
            }),
            lifecycle: Mutex::new(Lifecycle::Idle),
            manual: Mutex::new(None),
        })
    }

    /// Spawn the scheduled refresh loop. Only the first call succeeds.
    pub fn start(&self) -> Result<(), RefresherError> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        if !matches!(*lifecycle, Lifecycle::Idle) {
            return Err(RefresherError::AlreadyStarted);
        }
        self.shared
            .store
            .set_next_scheduled(wall_clock_after(self.shared.config.warmup_period));
        let handle = tokio::spawn(run_schedule(Arc::clone(&self.shared)));
        *lifecycle = Lifecycle::Running(handle);
        tracing::info!(
            interval_secs = self.shared.config.interval.as_secs(),
            warmup_secs = self.shared.config.warmup_period.as_secs(),
            "refresh scheduler started"
        );
        Ok(())
    }

    /// Stop the scheduler and any in-flight refresh, waiting at most `timeout`.
    ///
    /// Cancellation reaches the scheduler sleep, backoff waits and the
    /// discovery call. Tasks still running when `timeout` expires are aborted
    /// and `ShutdownTimeout` is returned.
    pub async fn stop(&self, timeout: Duration) -> Result<(), RefresherError> {
        // Cancel under the manual lock so a racing trigger either sees the
        // cancellation or has already stored its handle for us to await.
        let manual = {
            let mut manual = self.manual.lock().unwrap_or_else(PoisonError::into_inner);
            self.shared.shutdown.cancel();
            manual.take()
        };
        let schedule = {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(handle) => Some(handle),
                Lifecycle::Idle | Lifecycle::Stopped => None,
            }
        };

        let handles: Vec<JoinHandle<()>> = schedule.into_iter().chain(manual).collect();
        let aborts: Vec<AbortHandle> = handles.iter().map(|h| h.abort_handle()).collect();
        let wait_all = async {
            for handle in handles {
                if let Err(e) = handle.await {
                    if e.is_panic() {
                        tracing::warn!("refresh task panicked during shutdown: {}", e);
                    }
                }
            }
        };

        let res = tokio::time::timeout(timeout, wait_all).await;
        if res.is_err() {
            for abort in aborts {
                abort.abort();
            }
        }
        self.shared.store.set_next_scheduled(None);
        match res {
            Ok(()) => {
                tracing::info!("refresh scheduler stopped");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    in_progress = self.shared.coordinator.is_running(),
                    "shutdown timed out; refresh left incomplete"
                );
                Err(RefresherError::ShutdownTimeout(timeout))
            }
        }
    }

    /// Ask for a refresh outside the schedule. Returns without waiting for it.
    pub fn refresh_now(&self, now: Instant) -> TriggerOutcome {
        let mut manual = self.manual.lock().unwrap_or_else(PoisonError::into_inner);
        if self.shared.shutdown.is_cancelled() {
            return TriggerOutcome::Rejected(RejectReason::Stopped);
        }
        if !self.shared.limiter.allow(now) {
            tracing::debug!("manual refresh rejected: rate limited");
            return TriggerOutcome::Rejected(RejectReason::RateLimited);
        }
        let Ok(permit) = self.shared.coordinator.try_start() else {
            tracing::debug!("manual refresh rejected: refresh already in progress");
            return TriggerOutcome::Rejected(RejectReason::Busy);
        };

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            run_cycle(&shared, permit, Trigger::Manual).await;
        });
        // Single-flight means any previous manual task has already released its permit.
        *manual = Some(handle);
        tracing::debug!("manual refresh triggered");
        TriggerOutcome::Triggered
    }

    /// Current status. Never waits on a running refresh.
    pub fn status(&self) -> RefreshStatus {
        let mut status = self.shared.store.load().status.clone();
        status.in_progress = self.shared.coordinator.is_running();
        status
    }

    /// Last successfully discovered targets; kept across failed refreshes.
    pub fn targets(&self) -> Arc<TargetSet> {
        self.shared.store.targets()
    }

    /// Receive an event for every finished cycle from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.shared.events.subscribe()
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}
