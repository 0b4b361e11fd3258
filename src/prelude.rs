//! Convenient re-exports for common types.

pub use crate::config::{Config, ConfigBuilder, SchedulingModel};
pub use crate::error::{BoxError, Error, Result};
pub use crate::executor::{PanicStrategy, TaskId, TaskState};
pub use crate::handoff::{LivenessTracker, TaskHandle};
pub use crate::host::{Function, HelloBindings, Output, Points, Value};
pub use crate::runtime::EventLoop;
