//! Handoff primitives shared by every event loop: the transfer record, the
//! liveness tracker, task handles and the fault channel.

pub(crate) mod baton;
pub mod fault;
pub mod handle;
pub mod liveness;

pub use fault::FaultHandler;
pub use handle::TaskHandle;
pub use liveness::{LivenessTracker, Registration};
