//! Fixed-size worker pool behind the thread-pool scheduling model.

use super::task::Task;
use super::worker::{Shared, Worker};
use super::Dispatch;
use crate::config::{Config, SchedulingModel};
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[cfg(target_os = "linux")]
fn pin_to_core(core: usize) -> bool {
    // SAFETY: the set is zero-initialised and sized for the call, and pid 0
    // targets the calling thread only.
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(core % libc::CPU_SETSIZE as usize, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) == 0
    }
}

#[cfg(not(target_os = "linux"))]
fn pin_to_core(_core: usize) -> bool {
    false
}

pub struct CpuPool {
    shared: Arc<Shared>,
    threads: Vec<JoinHandle<()>>,
    next_wake: AtomicUsize,
}

impl CpuPool {
    pub fn new(config: &Config) -> Result<Self> {
        let num_threads = config.worker_threads();
        if num_threads == 0 {
            return Err(Error::config("need at least 1 thread"));
        }

        let (workers, stealers) = Worker::set(num_threads);
        let mut pool = Self {
            shared: Arc::new(Shared::new(stealers)),
            threads: Vec::with_capacity(num_threads),
            next_wake: AtomicUsize::new(0),
        };

        // on error the partially built pool is dropped, which joins the
        // threads already started
        for worker in workers {
            let handle = pool.spawn(config, worker)?;
            pool.threads.push(handle);
        }

        tracing::debug!(num_threads, prefix = %config.thread_name_prefix, "worker pool started");
        Ok(pool)
    }

    fn spawn(&self, config: &Config, worker: Worker) -> Result<JoinHandle<()>> {
        let mut builder =
            thread::Builder::new().name(format!("{}-{}", config.thread_name_prefix, worker.index()));
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }

        let shared = self.shared.clone();
        let pin = config.pin_workers;

        builder
            .spawn(move || {
                if pin && !pin_to_core(worker.index()) {
                    tracing::warn!(worker = worker.index(), "failed to pin worker thread");
                }
                worker.run(&shared);
            })
            .map_err(|e| Error::executor(format!("spawn failed: {e}")))
    }

    pub(crate) fn submit(&self, task: Task) -> Result<()> {
        if self.shared.is_closing() {
            return Err(Error::Shutdown);
        }

        self.shared.accept(task);
        self.wake_one();
        Ok(())
    }

    fn wake_one(&self) {
        if self.threads.is_empty() {
            return;
        }
        let i = self.next_wake.fetch_add(1, Ordering::Relaxed) % self.threads.len();
        self.threads[i].thread().unpark();
    }

    /// Tasks accepted but not yet finished by a worker.
    pub fn pending_tasks(&self) -> usize {
        self.shared.queued()
    }

    pub fn num_threads(&self) -> usize {
        self.threads.len()
    }

    pub fn tasks_executed(&self) -> u64 {
        self.shared.executed()
    }

    /// Stops accepting tasks, lets the workers drain what is queued and joins
    /// them.
    pub fn shutdown(&mut self) {
        self.close();

        if self.threads.is_empty() {
            return;
        }
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().map(str::to_owned);
            if handle.join().is_err() {
                tracing::error!(thread = ?name, "worker thread panicked");
            }
        }

        tracing::debug!(
            executed = self.shared.executed(),
            stolen = self.shared.stolen(),
            "worker pool stopped"
        );
    }
}

impl Dispatch for CpuPool {
    fn dispatch(&self, task: Task) -> Result<()> {
        self.submit(task)
    }

    fn close(&self) {
        self.shared.close();
        // parked workers need to see the flag to drain and exit
        for handle in &self.threads {
            handle.thread().unpark();
        }
    }

    fn model(&self) -> SchedulingModel {
        SchedulingModel::ThreadPool
    }
}

impl Drop for CpuPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for CpuPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuPool")
            .field("num_threads", &self.threads.len())
            .field("pending_tasks", &self.pending_tasks())
            .field("closing", &self.shared.is_closing())
            .finish()
    }
}
