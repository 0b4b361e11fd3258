//! Task execution infrastructure.
//!
//! The two dispatchers behind an event loop: a worker thread pool and a
//! cooperative queue drained on the calling thread.

pub mod cooperative;
pub mod cpu_pool;
pub mod panic_handler;
pub mod task;
pub(crate) mod worker;

pub use cooperative::CooperativeQueue;
pub use cpu_pool::CpuPool;
pub use panic_handler::{PanicHandler, PanicInfo, PanicSite, PanicStrategy};
pub use task::{TaskId, TaskState};

pub(crate) use task::Task;

use crate::config::SchedulingModel;
use crate::error::Result;

/// Something that can run a task on a worker context.
pub(crate) trait Dispatch: Send + Sync {
    /// Hand `task` to the worker context. Must not run it inline.
    fn dispatch(&self, task: Task) -> Result<()>;

    /// Run work that belongs to the calling context's own turn. Returns the
    /// number of tasks run.
    fn run_local(&self) -> usize {
        0
    }

    fn has_local_work(&self) -> bool {
        false
    }

    /// Refuse further tasks. Tasks already accepted still run.
    fn close(&self);

    fn model(&self) -> SchedulingModel;
}
