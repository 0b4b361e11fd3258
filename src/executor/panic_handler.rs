//! Panic containment for user code.
//!
//! Work functions and completion functions are the only user code the engine
//! runs. Both go through [`PanicHandler::execute`], which turns an unwinding
//! panic into a [`PanicInfo`] the caller folds into the matching error.

use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

/// What to do when a work or completion function panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicStrategy {
    /// Abort the process.
    Abort,
    /// Capture the panic silently.
    Isolate,
    /// Capture the panic and log it.
    #[default]
    LogAndContinue,
}

/// Which side of the handoff the panicking code ran on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicSite {
    Work,
    Completion,
}

impl fmt::Display for PanicSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PanicSite::Work => "work function",
            PanicSite::Completion => "completion",
        })
    }
}

#[derive(Debug, Default)]
pub struct PanicHandler {
    strategy: PanicStrategy,
    in_work: AtomicUsize,
    in_completion: AtomicUsize,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn execute<F, R>(&self, site: PanicSite, f: F) -> Result<R, PanicInfo>
    where
        F: FnOnce() -> R,
    {
        let payload = match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => return Ok(value),
            Err(payload) => payload,
        };

        self.counter(site).fetch_add(1, Ordering::Relaxed);
        let info = PanicInfo::new(site, payload);

        match self.strategy {
            PanicStrategy::Abort => {
                tracing::error!(%site, message = %info.message, "panic with abort strategy");
                std::process::abort();
            }
            PanicStrategy::Isolate => {}
            PanicStrategy::LogAndContinue => {
                tracing::warn!(%site, message = %info.message, "captured panic");
            }
        }

        Err(info)
    }

    fn counter(&self, site: PanicSite) -> &AtomicUsize {
        match site {
            PanicSite::Work => &self.in_work,
            PanicSite::Completion => &self.in_completion,
        }
    }

    /// Panics captured on either side.
    pub fn panic_count(&self) -> usize {
        self.panics_at(PanicSite::Work) + self.panics_at(PanicSite::Completion)
    }

    pub fn panics_at(&self, site: PanicSite) -> usize {
        self.counter(site).load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone)]
pub struct PanicInfo {
    pub site: PanicSite,
    pub message: String,
}

impl PanicInfo {
    fn new(site: PanicSite, payload: Box<dyn Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(s) => *s,
            Err(payload) => payload
                .downcast_ref::<&str>()
                .map_or_else(|| "unknown panic".to_string(), |s| s.to_string()),
        };
        Self { site, message }
    }
}

impl fmt::Display for PanicInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panicked: {}", self.message)
    }
}
