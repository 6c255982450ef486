use crate::types::SlotCandidate;
use chrono::{NaiveTime, Timelike};
use clap::ValueEnum;

/// Minutes value given to time labels that can't be parsed. Larger than any
/// sensible cutoff, so such slots never qualify.
pub const UNPARSEABLE_MINUTES: u32 = 999;

/// 10:30, the latest acceptable start time by default.
pub const DEFAULT_CUTOFF_MINUTES: u32 = 10 * 60 + 30;

pub const DEFAULT_MIN_PLAYERS: u32 = 2;

/// Which entry of the booking panel's player-count buttons gets clicked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PlayerSelection {
    /// The last button, i.e. the largest party size the site offers.
    #[default]
    Maximum,
    /// The button matching the slot's free player count, else the last one.
    MatchAvailable,
}

/// Minutes since midnight of a "9:30 AM" or "14:05" style label.
pub fn parse_time_of_day(label: &str) -> Option<u32> {
    let label = label.trim();
    NaiveTime::parse_from_str(label, "%I:%M %p")
        .or_else(|_| NaiveTime::parse_from_str(label, "%H:%M"))
        .ok()
        .map(|time| time.hour() * 60 + time.minute())
}

/// Like [`parse_time_of_day`], mapping unparseable labels to
/// [`UNPARSEABLE_MINUTES`].
pub fn time_to_minutes(label: &str) -> u32 {
    parse_time_of_day(label).unwrap_or(UNPARSEABLE_MINUTES)
}

pub fn parse_player_count(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}

impl SlotCandidate {
    pub fn new(time_label: &str, players_text: Option<&str>) -> Self {
        Self {
            time_label: time_label.trim().to_string(),
            start_minutes: time_to_minutes(time_label),
            available_players: players_text.and_then(parse_player_count),
        }
    }

    pub fn qualifies(&self, cutoff_minutes: u32, min_players: u32) -> bool {
        self.start_minutes < cutoff_minutes
            && self
                .available_players
                .is_some_and(|players| players >= min_players)
    }
}

/// Index of the first candidate, in listing order, that starts before the
/// cutoff and has room for at least `min_players`. First match, not best match.
pub fn select_first_slot(
    candidates: &[SlotCandidate],
    cutoff_minutes: u32,
    min_players: u32,
) -> Option<usize> {
    candidates
        .iter()
        .position(|candidate| candidate.qualifies(cutoff_minutes, min_players))
}

/// Index of the player-count button to click, given the buttons' texts.
pub fn player_button_index(
    selection: PlayerSelection,
    button_texts: &[String],
    available_players: u32,
) -> Option<usize> {
    let last = button_texts.len().checked_sub(1)?;
    match selection {
        PlayerSelection::Maximum => Some(last),
        PlayerSelection::MatchAvailable => Some(
            button_texts
                .iter()
                .position(|text| parse_player_count(text) == Some(available_players))
                .unwrap_or(last),
        ),
    }
}
