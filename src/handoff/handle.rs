use crate::executor::task::StateCell;
use crate::executor::{TaskId, TaskState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Observer for an in-flight task. Dropping it has no effect on the task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    state: StateCell,
    delivered: Arc<AtomicBool>,
}

impl TaskHandle {
    pub(crate) fn new(id: TaskId, state: StateCell, delivered: Arc<AtomicBool>) -> Self {
        Self {
            id,
            state,
            delivered,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn state(&self) -> TaskState {
        self.state.get()
    }

    /// The work function has returned (or failed).
    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    /// The completion function has been invoked on the calling context.
    pub fn is_delivered(&self) -> bool {
        self.delivered.load(Ordering::Acquire)
    }
}
