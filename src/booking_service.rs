use crate::backend::{BookingBackend, TriggerOutcome};
use crate::booker::{run_once, BookingSettings};
use crate::browser::BrowserLauncher;
use crate::state_store::BookingStateStore;
use crate::types::{BookingRun, RunStatus, RunStep};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Runs booking attempts on background tasks, one at a time.
#[derive(Clone)]
pub struct BookingService<L: BrowserLauncher> {
    store: BookingStateStore,
    launcher: L,
    settings: Arc<BookingSettings>,
}

impl<L: BrowserLauncher> BookingService<L> {
    pub fn new(launcher: L, settings: BookingSettings) -> Self {
        Self {
            store: BookingStateStore::default(),
            launcher,
            settings: Arc::new(settings),
        }
    }
}

impl<L: BrowserLauncher> BookingBackend for BookingService<L> {
    fn trigger_run(&self) -> TriggerOutcome {
        let Some(ticket) = self.store.try_begin() else {
            return TriggerOutcome::AlreadyRunning;
        };

        let launcher = self.launcher.clone();
        let settings = Arc::clone(&self.settings);
        tokio::spawn(async move {
            let tracker = ticket.tracker();
            let run = AssertUnwindSafe(run_once(&launcher, &settings, &tracker))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    BookingRun::now(
                        RunStatus::Error,
                        "Error during booking automation: run panicked",
                    )
                });
            if !tracker.current().is_terminal() {
                tracker.advance(RunStep::Failed);
            }

            match run.status {
                RunStatus::Success => info!(message = %run.message, "Booking run finished"),
                RunStatus::Failed => warn!(message = %run.message, "Booking run failed"),
                _ => error!(message = %run.message, "Booking run errored"),
            }
            ticket.finish(run);
        });

        TriggerOutcome::Started
    }

    fn in_progress(&self) -> bool {
        self.store.in_progress()
    }

    fn last_result(&self) -> BookingRun {
        self.store.last_result()
    }

    fn current_step(&self) -> RunStep {
        self.store.current_step()
    }
}
