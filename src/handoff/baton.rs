//! The transfer record passed across the context boundary.
//!
//! Phases, each with a single writer:
//! 1. the submitter fills in the payload,
//! 2. the worker consumes the payload and writes the output,
//! 3. the calling context takes the output and drops the record.

use crate::error::{BoxError, Error, Result};
use crate::executor::task::StateCell;
use crate::executor::{PanicHandler, PanicSite, TaskId, TaskState};
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub(crate) struct Baton<P, O> {
    id: TaskId,
    payload: Option<P>,
    output: Option<Result<O>>,
    state: StateCell,
    submitted_at: Instant,
}

impl<P, O> Baton<P, O>
where
    P: Send + 'static,
    O: Send + 'static,
{
    pub(crate) fn new(id: TaskId, payload: P, state: StateCell) -> Self {
        Self {
            id,
            payload: Some(payload),
            output: None,
            state,
            submitted_at: Instant::now(),
        }
    }

    pub(crate) fn id(&self) -> TaskId {
        self.id
    }

    /// Worker phase.
    pub(crate) fn run<W, E>(&mut self, work: W, panics: &PanicHandler)
    where
        W: FnOnce(P) -> std::result::Result<O, E>,
        E: Into<BoxError>,
    {
        let Some(payload) = self.payload.take() else {
            self.finish(Err(Error::work_failure("payload already consumed")));
            return;
        };

        self.state.set(TaskState::Running);

        let result = run_work(payload, work, panics);

        if let Err(ref e) = result {
            tracing::warn!(task = %self.id, error = %e, "work function failed");
        }

        self.finish(result);
    }

    fn finish(&mut self, result: Result<O>) {
        self.state.set(if result.is_ok() {
            TaskState::Completed
        } else {
            TaskState::Failed
        });
        self.output = Some(result);
    }

    /// Completion phase.
    pub(crate) fn take_output(&mut self) -> Result<O> {
        self.output
            .take()
            .unwrap_or_else(|| Err(Error::executor("baton returned without output")))
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.submitted_at.elapsed()
    }
}

/// Runs `work` on the current thread, folding errors and panics into
/// `Error::WorkFailure`.
pub(crate) fn run_work<P, O, W, E>(payload: P, work: W, panics: &PanicHandler) -> Result<O>
where
    W: FnOnce(P) -> std::result::Result<O, E>,
    E: Into<BoxError>,
{
    match panics.execute(PanicSite::Work, move || work(payload)) {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(Error::work_failure(e.into().to_string())),
        Err(panic) => Err(Error::work_failure(panic.to_string())),
    }
}

/// A worker-finished baton on its way back to the calling context.
pub(crate) struct Finished {
    pub(crate) id: TaskId,
    pub(crate) baton: Box<dyn Any + Send>,
}

/// Outcome of running a completion on the calling context.
#[derive(Debug)]
pub(crate) struct Delivered {
    pub(crate) state: TaskState,
    pub(crate) latency: Duration,
}

/// Calling-context side of a task: owns the completion function until the
/// baton comes back.
pub(crate) type Deliver = Box<dyn FnOnce(Box<dyn Any + Send>) -> Result<Delivered>>;

pub(crate) fn deliver_with<P, O, C, E>(completion: C, panics: Arc<PanicHandler>) -> Deliver
where
    P: Send + 'static,
    O: Send + 'static,
    C: FnOnce(Result<O>) -> std::result::Result<(), E> + 'static,
    E: Into<BoxError>,
{
    Box::new(move |any| {
        let mut baton = any
            .downcast::<Baton<P, O>>()
            .map_err(|_| Error::executor("baton type mismatch"))?;

        let output = baton.take_output();
        let state = if output.is_ok() {
            TaskState::Completed
        } else {
            TaskState::Failed
        };
        let latency = baton.elapsed();
        let id = baton.id();

        let outcome = match panics.execute(PanicSite::Completion, move || completion(output)) {
            Ok(Ok(())) => Ok(Delivered { state, latency }),
            Ok(Err(e)) => Err(Error::callback_failure(e.into().to_string())),
            Err(panic) => Err(Error::callback_failure(panic.to_string())),
        };

        tracing::debug!(task = %id, ?state, ok = outcome.is_ok(), "completion delivered");
        outcome
    })
}
