//! Pool worker threads.
//!
//! A worker serves its own FIFO deque first, then refills a batch from the
//! shared injector, then steals from a sibling picked at random. It only
//! exits once the pool is closing and every accepted task has finished.

use super::task::Task;
use crossbeam_deque::{Injector, Steal, Stealer, Worker as Deque};
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// State every worker of one pool sees.
pub(crate) struct Shared {
    injector: Injector<Task>,
    stealers: Vec<Stealer<Task>>,
    closing: AtomicBool,
    /// Accepted but not yet finished.
    queued: AtomicUsize,
    executed: AtomicU64,
    stolen: AtomicU64,
}

impl Shared {
    pub(crate) fn new(stealers: Vec<Stealer<Task>>) -> Self {
        Self {
            injector: Injector::new(),
            stealers,
            closing: AtomicBool::new(false),
            queued: AtomicUsize::new(0),
            executed: AtomicU64::new(0),
            stolen: AtomicU64::new(0),
        }
    }

    pub(crate) fn accept(&self, task: Task) {
        self.queued.fetch_add(1, Ordering::AcqRel);
        self.injector.push(task);
    }

    pub(crate) fn close(&self) {
        self.closing.store(true, Ordering::Release);
    }

    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    fn is_drained(&self) -> bool {
        self.is_closing() && self.queued() == 0
    }

    pub(crate) fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    pub(crate) fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    pub(crate) fn stolen(&self) -> u64 {
        self.stolen.load(Ordering::Relaxed)
    }
}

pub(crate) struct Worker {
    index: usize,
    deque: Deque<Task>,
}

impl Worker {
    /// `n` workers plus the stealers that go into [`Shared`].
    pub(crate) fn set(n: usize) -> (Vec<Worker>, Vec<Stealer<Task>>) {
        let workers: Vec<Worker> = (0..n)
            .map(|index| Worker {
                index,
                deque: Deque::new_fifo(),
            })
            .collect();
        let stealers = workers.iter().map(|w| w.deque.stealer()).collect();
        (workers, stealers)
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn run(self, shared: &Shared) {
        let mut idle = Idle::default();

        loop {
            match self.next_task(shared) {
                Some(task) => {
                    idle.reset();
                    self.run_task(task, shared);
                }
                None if shared.is_drained() => break,
                None => idle.wait(),
            }
        }

        tracing::trace!(worker = self.index, "worker exiting");
    }

    fn next_task(&self, shared: &Shared) -> Option<Task> {
        self.deque
            .pop()
            .or_else(|| settle(|| shared.injector.steal_batch_and_pop(&self.deque)))
            .or_else(|| self.steal(shared))
    }

    fn steal(&self, shared: &Shared) -> Option<Task> {
        let n = shared.stealers.len();
        if n < 2 {
            return None;
        }

        let start = rand::thread_rng().gen_range(0..n);
        let task = (0..n)
            .map(|offset| (start + offset) % n)
            .filter(|&victim| victim != self.index)
            .find_map(|victim| settle(|| shared.stealers[victim].steal_batch_and_pop(&self.deque)))?;

        shared.stolen.fetch_add(1, Ordering::Relaxed);
        Some(task)
    }

    fn run_task(&self, task: Task, shared: &Shared) {
        let id = task.id;
        tracing::trace!(worker = self.index, task = %id, "running task");

        // user panics are already caught inside the job; this guards the
        // plumbing around it so the worker survives
        if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| task.execute())).is_err() {
            tracing::error!(worker = self.index, task = %id, "task panicked outside its work function");
        }

        shared.executed.fetch_add(1, Ordering::Relaxed);
        shared.queued.fetch_sub(1, Ordering::AcqRel);
    }
}

fn settle<T>(mut attempt: impl FnMut() -> Steal<T>) -> Option<T> {
    loop {
        match attempt() {
            Steal::Success(task) => return Some(task),
            Steal::Empty => return None,
            Steal::Retry => continue,
        }
    }
}

/// Spin, then yield, then park briefly. Submitters unpark a worker, so the
/// park only bounds how late a missed wake-up is noticed.
#[derive(Default)]
struct Idle {
    rounds: u32,
}

impl Idle {
    const SPIN_ROUNDS: u32 = 10;
    const YIELD_ROUNDS: u32 = 20;
    const PARK: Duration = Duration::from_micros(100);

    fn wait(&mut self) {
        self.rounds = self.rounds.saturating_add(1);

        if self.rounds <= Self::SPIN_ROUNDS {
            for _ in 0..(1u32 << self.rounds.min(6)) {
                std::hint::spin_loop();
            }
        } else if self.rounds <= Self::YIELD_ROUNDS {
            thread::yield_now();
        } else {
            thread::park_timeout(Self::PARK);
        }
    }

    fn reset(&mut self) {
        self.rounds = 0;
    }
}
