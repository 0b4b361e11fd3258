//! baton - asynchronous task handoff
//!
//! Submit a payload and a work function from a calling context, run the work
//! on an independent execution context, and get the result delivered back to
//! a completion function on the calling context, exactly once.
//!
//! # Quick Start
//!
//! ```no_run
//! use baton::prelude::*;
//!
//! let ev = EventLoop::thread_pool().unwrap();
//!
//! ev.submit(
//!     "hello".to_string(),
//!     |text: String| Ok::<_, BoxError>(text.len()),
//!     |len| {
//!         println!("wrote {} bytes", len?);
//!         Ok::<_, BoxError>(())
//!     },
//! )
//! .unwrap();
//!
//! // does not return before the completion above has run
//! ev.run().unwrap();
//! ```
//!
//! # Features
//!
//! - **Two scheduling models**: a fixed worker pool, or cooperative work run
//!   on the calling thread at the next turn
//! - **Liveness tracking**: one registration per in-flight task, released
//!   exactly once
//! - **Failure routing**: work errors and panics go to the completion,
//!   completion failures go to the fault channel
//! - **Host bindings**: dynamic values, argument validation and the
//!   hello/print/point bindings built on the engine
//! - **Telemetry**: counters and handoff latency histogram (optional)

// Lint configuration
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod handoff;
pub mod host;
pub mod memory;
pub mod prelude;
pub mod runtime;
pub mod telemetry;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder, SchedulingModel};
pub use error::{BoxError, Error, Result};
pub use executor::{PanicStrategy, TaskId, TaskState};
pub use handoff::{LivenessTracker, TaskHandle};
pub use runtime::EventLoop;
