use crate::types::{BookingRun, RunStatus, RunStep};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, error};

#[derive(Debug, Default)]
struct RunState {
    in_progress: bool,
    last_result: BookingRun,
}

/// Process-lifetime record of the booking runs: whether one is in progress
/// and how the latest one went. Cloning shares the same state.
#[derive(Debug, Clone)]
pub struct BookingStateStore {
    state: Arc<Mutex<RunState>>,
    step: StepTracker,
}

impl Default for BookingStateStore {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            step: StepTracker::detached(),
        }
    }
}

impl BookingStateStore {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks a run as started unless one already is. Check and set happen
    /// under the same lock, so two concurrent callers can't both succeed.
    pub fn try_begin(&self) -> Option<RunTicket> {
        let mut state = self.lock();
        if state.in_progress {
            debug!("Run requested while another one is in progress");
            return None;
        }
        state.in_progress = true;
        state.last_result = BookingRun::running();
        drop(state);

        self.step.advance(RunStep::Idle);
        Some(RunTicket {
            store: self.clone(),
            finished: false,
        })
    }

    pub fn in_progress(&self) -> bool {
        self.lock().in_progress
    }

    pub fn last_result(&self) -> BookingRun {
        self.lock().last_result.clone()
    }

    pub fn current_step(&self) -> RunStep {
        self.step.current()
    }

    fn complete(&self, run: BookingRun) {
        let mut state = self.lock();
        state.last_result = run;
        state.in_progress = false;
    }
}

/// Proof that the holder owns the single run slot. The slot is released when
/// the ticket is finished, or dropped if the run never got that far.
#[derive(Debug)]
pub struct RunTicket {
    store: BookingStateStore,
    finished: bool,
}

impl RunTicket {
    pub fn tracker(&self) -> StepTracker {
        self.store.step.clone()
    }

    pub fn finish(mut self, run: BookingRun) {
        self.finished = true;
        self.store.complete(run);
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        error!("Booking run ended without reporting a result");
        self.store.step.advance(RunStep::Failed);
        self.store.complete(BookingRun::now(
            RunStatus::Error,
            "Error during booking automation: run was aborted",
        ));
    }
}

/// Publishes the workflow step a run has reached.
#[derive(Debug, Clone)]
pub struct StepTracker(Arc<watch::Sender<RunStep>>);

impl StepTracker {
    pub fn detached() -> Self {
        let (sender, _) = watch::channel(RunStep::Idle);
        Self(Arc::new(sender))
    }

    pub fn advance(&self, step: RunStep) {
        let previous = self.0.send_replace(step);
        if previous != step {
            debug!(?previous, ?step, "Booking run advanced");
        }
    }

    pub fn current(&self) -> RunStep {
        *self.0.borrow()
    }
}
