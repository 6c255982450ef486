use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Success,
    Failed,
    Error,
}

/// Snapshot of the most recent booking attempt. Only the latest one is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRun {
    pub status: RunStatus,
    pub timestamp: Option<DateTime<Local>>,
    pub message: String,
}

impl BookingRun {
    pub fn idle() -> Self {
        Self {
            status: RunStatus::Idle,
            timestamp: None,
            message: "No bookings attempted yet".into(),
        }
    }

    pub fn running() -> Self {
        Self::now(RunStatus::Running, "Tee time booking automation started")
    }

    pub fn now(status: RunStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            timestamp: Some(Local::now()),
            message: message.into(),
        }
    }
}

impl Default for BookingRun {
    fn default() -> Self {
        Self::idle()
    }
}

/// Progress of a single run through the booking workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStep {
    #[default]
    Idle,
    Authenticating,
    SelectingRate,
    SelectingDate,
    ScanningSlots,
    ConfiguringBooking,
    Submitted,
    Failed,
}

impl RunStep {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStep::Submitted | RunStep::Failed)
    }
}

/// One entry of the site's tee time listing, as read during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCandidate {
    pub time_label: String,
    pub start_minutes: u32,
    pub available_players: Option<u32>,
}

/// The slot a run clicked, and whether the final book control was pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookedSlot {
    pub date: NaiveDate,
    pub time_label: String,
    pub available_players: u32,
    pub submitted: bool,
}
