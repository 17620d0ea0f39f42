//! Single-flight gate for refresh cycles.
//!
//! Admission is one `compare_exchange` on an atomic flag. A caller that loses
//! the race is told the refresh is busy; it never waits for or shares the
//! running cycle's result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A refresh cycle is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("refresh already in progress")]
pub struct Busy;

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    running: AtomicBool,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to become the single running refresh.
    ///
    /// The returned permit clears the flag when dropped, so every exit path
    /// (completion, early return, panic, task abort) releases it exactly once.
    pub fn try_start(self: &Arc<Self>) -> Result<RefreshPermit, Busy> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| RefreshPermit {
                coordinator: Arc::clone(self),
            })
            .map_err(|_| Busy)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn finish(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Proof of admission; releases the coordinator when dropped.
#[derive(Debug)]
pub struct RefreshPermit {
    coordinator: Arc<RefreshCoordinator>,
}

impl Drop for RefreshPermit {
    fn drop(&mut self) {
        self.coordinator.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_start_is_busy_until_release() {
        let c = Arc::new(RefreshCoordinator::new());
        let permit = c.try_start().expect("first start admitted");
        assert!(c.is_running());
        assert_eq!(c.try_start().unwrap_err(), Busy);
        drop(permit);
        assert!(!c.is_running());
        assert!(c.try_start().is_ok());
    }

    #[test]
    fn permit_released_on_panic() {
        let c = Arc::new(RefreshCoordinator::new());
        let c2 = Arc::clone(&c);
        let res = std::panic::catch_unwind(move || {
            let _permit = c2.try_start().unwrap();
            panic!("refresh blew up");
        });
        assert!(res.is_err());
        assert!(!c.is_running());
    }

    #[test]
    fn concurrent_starts_admit_exactly_one() {
        let c = Arc::new(RefreshCoordinator::new());
        let barrier = Arc::new(std::sync::Barrier::new(16));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let c = Arc::clone(&c);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    // Keep the permit alive past the join so no one can re-acquire.
                    c.try_start().ok().map(std::mem::forget).is_some()
                })
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&ok| ok)
            .count();
        assert_eq!(admitted, 1);
    }
}
