//! Non-blocking guard that keeps backup runs from overlapping.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Single-slot "run in progress" flag shared by every trigger.
#[derive(Clone, Default)]
pub struct RunGate {
    running: Arc<AtomicBool>,
    idle: Arc<Notify>,
}

impl RunGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot, or returns `None` when a run is already active.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: self.running.clone(),
                idle: self.idle.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Resolves once no run holds the gate.
    pub async fn wait_idle(&self) {
        loop {
            let released = self.idle.notified();
            tokio::pin!(released);
            // Register before checking so a release in between is not missed
            released.as_mut().enable();
            if !self.is_running() {
                return;
            }
            released.await;
        }
    }
}

/// Releases the gate when dropped.
pub struct RunPermit {
    running: Arc<AtomicBool>,
    idle: Arc<Notify>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.idle.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let gate = RunGate::new();
        let permit = gate.try_acquire();
        assert!(permit.is_some());
        assert!(gate.is_running());
        assert!(gate.try_acquire().is_none());

        drop(permit);
        assert!(!gate.is_running());
        assert!(gate.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_clones_share_the_slot() {
        let gate = RunGate::new();
        let other = gate.clone();

        let permit = gate.try_acquire().expect("gate should be free");
        let refused = tokio::spawn(async move { other.try_acquire().is_none() })
            .await
            .unwrap();
        assert!(refused);
        drop(permit);
    }

    #[tokio::test]
    async fn test_wait_idle_returns_when_permit_drops() {
        let gate = RunGate::new();
        gate.wait_idle().await;

        let permit = gate.try_acquire().unwrap();
        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.wait_idle().await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(permit);
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken")
            .unwrap();
    }
}
