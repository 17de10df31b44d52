//! Checkpoint hand-off between the training loop and its consumers.

use std::sync::{Arc, Mutex, PoisonError};

use crate::network::Network;

/// Single-slot checkpoint mailbox. The trainer publishes an immutable
/// snapshot after every epoch; consumers poll and compare pointers to see
/// whether anything new arrived.
pub struct CheckpointSlot {
    inner: Mutex<Arc<dyn Network>>,
}

impl CheckpointSlot {
    #[must_use]
    pub fn new(initial: Arc<dyn Network>) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    pub fn publish(&self, snapshot: Arc<dyn Network>) {
        *self.lock() = snapshot;
    }

    #[must_use]
    pub fn latest(&self) -> Arc<dyn Network> {
        self.lock().clone()
    }

    /// Pointer identity against a previously fetched snapshot. Snapshots
    /// are immutable, so identity implies equal weights.
    #[must_use]
    pub fn changed_since(&self, seen: &Arc<dyn Network>) -> bool {
        !Arc::ptr_eq(&*self.lock(), seen)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Arc<dyn Network>> {
        // The slot holds plain pointers; a poisoned lock cannot leave them
        // inconsistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
