//! Process signals: termination (graceful stop) and SIGHUP (manual refresh).

/// Completes when the process receives SIGINT, SIGTERM or SIGQUIT.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Completes on Ctrl-C.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Stream of SIGHUP deliveries. Never yields on platforms without SIGHUP.
pub struct Hangup {
    #[cfg(unix)]
    inner: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Hangup {
    pub fn new() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};
        Ok(Self {
            inner: signal(SignalKind::hangup())?,
        })
    }

    pub async fn recv(&mut self) -> Option<()> {
        self.inner.recv().await
    }
}

#[cfg(not(unix))]
impl Hangup {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {})
    }

    pub async fn recv(&mut self) -> Option<()> {
        std::future::pending().await
    }
}
