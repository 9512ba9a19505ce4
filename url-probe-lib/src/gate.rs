//! Admission gate bounding how many probes run at once.
//!
//! The gate is a counting semaphore shared by every worker of one
//! dispatcher run. A permit is an RAII guard: it is released exactly once when it
//! is dropped, whichever way the probe holding it finishes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting concurrency limiter with acquire/release instrumentation.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    stats: Arc<GateCounters>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct GateCounters {
    acquired: AtomicUsize,
    released: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Point-in-time view of the gate counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateStats {
    pub capacity: usize,
    pub acquired: usize,
    pub released: usize,
    pub in_flight: usize,
    pub peak: usize,
}

impl AdmissionGate {
    /// Create a gate with `capacity` units. A capacity of zero is raised to one
    /// so that acquisition can always make progress.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            stats: Arc::new(GateCounters::default()),
            capacity,
        }
    }

    /// Wait for a free unit.
    ///
    /// Blocks the caller while `capacity` permits are held elsewhere.
    pub async fn acquire(&self) -> AdmissionPermit {
        // The semaphore is private to the gate and never closed.
        let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => unreachable!("admission gate semaphore closed"),
        };

        self.stats.acquired.fetch_add(1, Ordering::SeqCst);
        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(now, Ordering::SeqCst);

        AdmissionPermit {
            _permit: permit,
            stats: Arc::clone(&self.stats),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Units not currently held.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn stats(&self) -> GateStats {
        GateStats {
            capacity: self.capacity,
            acquired: self.stats.acquired.load(Ordering::SeqCst),
            released: self.stats.released.load(Ordering::SeqCst),
            in_flight: self.stats.in_flight.load(Ordering::SeqCst),
            peak: self.stats.peak.load(Ordering::SeqCst),
        }
    }
}

/// One held unit of an [`AdmissionGate`]. Dropping it releases the unit.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
    stats: Arc<GateCounters>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.stats.released.fetch_add(1, Ordering::SeqCst);
    }
}
