use crate::types::{BookingRun, RunStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning,
}

pub trait BookingBackend: Clone + Send + Sync + 'static {
    /// Starts a booking run in the background unless one is in progress.
    fn trigger_run(&self) -> TriggerOutcome;
    fn in_progress(&self) -> bool;
    fn last_result(&self) -> BookingRun;
    fn current_step(&self) -> RunStep;
}
