//! Single-threaded cooperative dispatch.
//!
//! Work is parked in a FIFO and only runs when the owning event loop reaches
//! its next turn, on the loop's own thread.

use super::task::Task;
use super::Dispatch;
use crate::config::SchedulingModel;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct CooperativeQueue {
    queue: Mutex<VecDeque<Task>>,
    closed: AtomicBool,
}

impl CooperativeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl Dispatch for CooperativeQueue {
    fn dispatch(&self, task: Task) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Shutdown);
        }
        self.queue.lock().push_back(task);
        Ok(())
    }

    fn run_local(&self) -> usize {
        // only what was queued before this point; work queued by these tasks
        // waits for the next turn
        let batch: Vec<Task> = self.queue.lock().drain(..).collect();
        let ran = batch.len();
        for task in batch {
            tracing::trace!(task = %task.id, "running cooperative task");
            task.execute();
        }
        ran
    }

    fn has_local_work(&self) -> bool {
        !self.is_empty()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn model(&self) -> SchedulingModel {
        SchedulingModel::Cooperative
    }
}
