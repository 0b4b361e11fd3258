use crate::config::{Config, SchedulingModel};
use crate::error::{BoxError, Error, Result};
use crate::executor::task::StateCell;
use crate::executor::{CooperativeQueue, CpuPool, Dispatch, PanicHandler, Task, TaskId, TaskState};
use crate::handoff::baton::{self, Baton, Deliver, Finished};
use crate::handoff::fault::FaultChannel;
use crate::handoff::{LivenessTracker, Registration, TaskHandle};
use crate::telemetry::{Metrics, MetricsSnapshot};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct Pending {
    registration: Registration,
    delivered: Arc<AtomicBool>,
    deliver: Deliver,
}

/// A calling context.
///
/// Work submitted here runs on the configured dispatcher; completions only
/// ever run on the thread that drives [`EventLoop::turn`] or
/// [`EventLoop::run`]. The loop is neither `Send` nor `Sync`.
pub struct EventLoop {
    dispatcher: Box<dyn Dispatch>,
    completions_tx: Sender<Finished>,
    completions_rx: Receiver<Finished>,
    pending: RefCell<HashMap<TaskId, Pending>>,
    liveness: LivenessTracker,
    faults: FaultChannel,
    panics: Arc<PanicHandler>,
    metrics: Arc<Metrics>,
    accepting: Cell<bool>,
    config: Config,
}

impl EventLoop {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let dispatcher: Box<dyn Dispatch> = match config.scheduling_model {
            SchedulingModel::ThreadPool => Box::new(CpuPool::new(&config)?),
            SchedulingModel::Cooperative => Box::new(CooperativeQueue::new()),
        };
        let (completions_tx, completions_rx) = unbounded();

        Ok(Self {
            dispatcher,
            completions_tx,
            completions_rx,
            pending: RefCell::new(HashMap::new()),
            liveness: LivenessTracker::new(),
            faults: FaultChannel::default(),
            panics: Arc::new(PanicHandler::new(config.panic_strategy)),
            metrics: Arc::new(Metrics::new()),
            accepting: Cell::new(true),
            config,
        })
    }

    /// Loop backed by a worker pool with the default config.
    pub fn thread_pool() -> Result<Self> {
        Self::new(Config::default())
    }

    /// Loop that runs work on its own thread at the next turn.
    pub fn cooperative() -> Result<Self> {
        Self::new(
            Config::builder()
                .scheduling_model(SchedulingModel::Cooperative)
                .build()?,
        )
    }

    /// Hand `payload` to `work` on a worker context and deliver the result
    /// to `completion` on this loop's thread, exactly once.
    ///
    /// Never blocks. The task keeps the loop alive until its completion has
    /// been delivered.
    pub fn submit<P, O, W, E, C, CE>(&self, payload: P, work: W, completion: C) -> Result<TaskHandle>
    where
        P: Send + 'static,
        O: Send + 'static,
        W: FnOnce(P) -> std::result::Result<O, E> + Send + 'static,
        E: Into<BoxError>,
        C: FnOnce(Result<O>) -> std::result::Result<(), CE> + 'static,
        CE: Into<BoxError>,
    {
        self.ensure_accepting()?;

        let id = TaskId::next();
        let state = StateCell::new();
        let delivered = Arc::new(AtomicBool::new(false));

        let mut baton = Baton::new(id, payload, state.clone());
        let tx = self.completions_tx.clone();
        let panics = self.panics.clone();
        let task = Task::with_id(id, move || {
            baton.run(work, &panics);
            // a dropped loop has nobody left to deliver to
            let _ = tx.send(Finished {
                id,
                baton: Box::new(baton),
            });
        });

        let deliver = baton::deliver_with::<P, O, C, CE>(completion, self.panics.clone());

        if let Err(e) = self.dispatcher.dispatch(task) {
            self.metrics.record_rejected();
            tracing::warn!(task = %id, error = %e, "dispatch rejected task");
            return Err(e);
        }

        // the baton can only come back through a later turn on this thread,
        // so registering after dispatch cannot miss a delivery
        self.pending.borrow_mut().insert(
            id,
            Pending {
                registration: self.liveness.register(),
                delivered: delivered.clone(),
                deliver,
            },
        );

        self.metrics.record_submit();
        tracing::debug!(task = %id, model = ?self.dispatcher.model(), "task submitted");

        Ok(TaskHandle::new(id, state, delivered))
    }

    /// Run `work` right here, with no handoff.
    pub fn run_sync<P, O, W, E>(&self, payload: P, work: W) -> Result<O>
    where
        W: FnOnce(P) -> std::result::Result<O, E>,
        E: Into<BoxError>,
    {
        self.ensure_accepting()?;
        baton::run_work(payload, work, &self.panics)
    }

    /// One non-blocking pass: run cooperative work queued before the turn,
    /// then deliver the completions available at that point.
    ///
    /// A failing completion ends the turn with that error unless a fault
    /// handler is installed. Remaining completions wait for the next turn.
    pub fn turn(&self) -> Result<usize> {
        self.dispatcher.run_local();

        let ready = self.completions_rx.len();
        let mut delivered = 0;
        for _ in 0..ready {
            match self.completions_rx.try_recv() {
                Ok(finished) => {
                    delivered += 1;
                    self.deliver(finished)?;
                }
                Err(_) => break,
            }
        }
        Ok(delivered)
    }

    /// Turn until no task is outstanding.
    pub fn run(&self) -> Result<()> {
        loop {
            self.turn()?;

            if !self.liveness.is_alive() {
                return Ok(());
            }
            if self.dispatcher.has_local_work() || !self.completions_rx.is_empty() {
                continue;
            }

            match self.completions_rx.recv_timeout(self.config.idle_poll_interval) {
                Ok(finished) => self.deliver(finished)?,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::executor("completion channel closed"));
                }
            }
        }
    }

    fn deliver(&self, finished: Finished) -> Result<()> {
        let Some(entry) = self.pending.borrow_mut().remove(&finished.id) else {
            tracing::warn!(task = %finished.id, "completion for unknown task dropped");
            return Ok(());
        };

        let Pending {
            registration,
            delivered,
            deliver,
        } = entry;

        registration.release();
        let outcome = deliver(finished.baton);
        delivered.store(true, Ordering::Release);

        match outcome {
            Ok(done) => {
                match done.state {
                    TaskState::Failed => self.metrics.record_failed(done.latency),
                    _ => self.metrics.record_completed(done.latency),
                }
                Ok(())
            }
            Err(fault) => {
                self.metrics.record_callback_failure();
                self.faults.raise(fault)
            }
        }
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.accepting.get() {
            Ok(())
        } else {
            Err(Error::Shutdown)
        }
    }

    /// Route completion failures to `handler` instead of failing the turn.
    pub fn set_fault_handler<F>(&self, handler: F)
    where
        F: FnMut(Error) + 'static,
    {
        self.faults.set_handler(Some(Box::new(handler)));
    }

    pub fn clear_fault_handler(&self) {
        self.faults.set_handler(None);
    }

    /// Completion failures raised so far, handled or not.
    pub fn fault_count(&self) -> u64 {
        self.faults.raised()
    }

    /// Stop accepting submissions. Work already submitted still completes.
    pub fn shutdown(&self) {
        self.accepting.set(false);
        self.dispatcher.close();
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.get()
    }

    pub fn outstanding(&self) -> usize {
        self.liveness.outstanding()
    }

    pub fn liveness(&self) -> &LivenessTracker {
        &self.liveness
    }

    pub fn model(&self) -> SchedulingModel {
        self.dispatcher.model()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn panic_count(&self) -> usize {
        self.panics.panic_count()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        let abandoned = self.pending.get_mut().len();
        if abandoned > 0 {
            tracing::warn!(abandoned, "event loop dropped with outstanding tasks");
        }
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("model", &self.dispatcher.model())
            .field("outstanding", &self.liveness.outstanding())
            .field("accepting", &self.accepting.get())
            .field("faults", &self.faults)
            .finish()
    }
}
