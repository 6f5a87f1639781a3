//! Busy gate
//!
//! At most one update attempt may be in flight. The manual trigger and every
//! interval tick acquire the same gate; whoever loses gets `None` and must give up
//! rather than wait. Release happens when the [`BusyGuard`] is dropped, so every
//! exit path (success, failure, panic, task cancellation) frees the gate.
//!
//! The semaphore permit is the only record of whether the gate is held; `is_busy()`
//! and `in_flight()` read it directly. The in-flight count is also published on a
//! watch channel, updated after the permit changes hands, so a subscriber woken by
//! a change always observes the gate in the state it was told about.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, watch};

/// Mutual-exclusion guard shared by all update paths
#[derive(Debug, Clone)]
pub struct BusyGate {
    permits: Arc<Semaphore>,
    in_flight: Arc<watch::Sender<usize>>,
}

/// Proof that the holder owns the gate
#[derive(Debug)]
pub struct BusyGuard {
    permit: Option<OwnedSemaphorePermit>,
    in_flight: Arc<watch::Sender<usize>>,
}

impl BusyGate {
    /// Create an open gate
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self {
            permits: Arc::new(Semaphore::new(1)),
            in_flight: Arc::new(tx),
        }
    }

    /// Take the gate without waiting
    ///
    /// Returns `None` when another attempt holds it.
    pub fn try_acquire(&self) -> Option<BusyGuard> {
        let permit = Arc::clone(&self.permits).try_acquire_owned().ok()?;
        self.in_flight.send_modify(|count| *count += 1);
        Some(BusyGuard {
            permit: Some(permit),
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    /// Number of attempts currently holding the gate (0 or 1)
    pub fn in_flight(&self) -> usize {
        1 - self.permits.available_permits().min(1)
    }

    /// Whether an attempt is in flight
    pub fn is_busy(&self) -> bool {
        self.permits.available_permits() == 0
    }

    /// Subscribe to the in-flight count
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.in_flight.subscribe()
    }

    /// Wait until no attempt holds the gate
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|count| *count == 0).await;
    }
}

impl Default for BusyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        // Permit first, so observers of the count never see a held gate
        self.permit.take();
        self.in_flight.send_modify(|count| *count = count.saturating_sub(1));
    }
}
