//! Outstanding-work tracking for a calling context.
//!
//! Every in-flight task holds exactly one [`Registration`]. Releasing consumes
//! the guard, so a unit can never be deregistered twice.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct Counters {
    outstanding: AtomicUsize,
    registered: AtomicU64,
    released: AtomicU64,
}

#[derive(Debug, Clone, Default)]
pub struct LivenessTracker {
    counters: Arc<Counters>,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> Registration {
        self.counters.outstanding.fetch_add(1, Ordering::AcqRel);
        self.counters.registered.fetch_add(1, Ordering::Relaxed);
        Registration {
            counters: self.counters.clone(),
        }
    }

    /// Units currently keeping the context alive.
    pub fn outstanding(&self) -> usize {
        self.counters.outstanding.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.outstanding() > 0
    }

    /// Registrations taken since creation.
    pub fn registrations(&self) -> u64 {
        self.counters.registered.load(Ordering::Relaxed)
    }

    /// Registrations released since creation.
    pub fn releases(&self) -> u64 {
        self.counters.released.load(Ordering::Relaxed)
    }
}

/// One pending unit. Dropping it deregisters.
#[derive(Debug)]
#[must_use = "dropping a registration immediately releases it"]
pub struct Registration {
    counters: Arc<Counters>,
}

impl Registration {
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::Relaxed);
        let prev = self.counters.outstanding.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "liveness counter underflow");
    }
}
