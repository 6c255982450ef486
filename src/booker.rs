use crate::browser::{BrowserError, BrowserLauncher, BrowserSession, ElementHandle};
use crate::calendar::{self, target_date};
use crate::locator::LocatorChain;
use crate::page::{capture, click_first, first_present, wait_for_any};
use crate::site;
use crate::slot_selection::{
    player_button_index, select_first_slot, PlayerSelection, DEFAULT_CUTOFF_MINUTES,
    DEFAULT_MIN_PLAYERS,
};
use crate::state_store::StepTracker;
use crate::types::{BookedSlot, BookingRun, RunStatus, RunStep, SlotCandidate};
use chrono::{DateTime, Local, NaiveDate};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("could not find the {target} (tried {candidates} selectors)")]
    NotFound {
        target: &'static str,
        candidates: usize,
    },
    #[error("no suitable tee times found among {scanned} listed slots (before {cutoff} with at least {min_players} players)")]
    NoQualifyingSlot {
        scanned: usize,
        cutoff: String,
        min_players: u32,
    },
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("booking workflow panicked: {0}")]
    Panicked(String),
}

impl BookingError {
    fn not_found(chain: &LocatorChain) -> Self {
        BookingError::NotFound {
            target: chain.target(),
            candidates: chain.candidates().len(),
        }
    }

    /// Site related failures mark the run as failed, everything else as an
    /// error.
    pub fn status(&self) -> RunStatus {
        match self {
            BookingError::NotFound { .. } | BookingError::NoQualifyingSlot { .. } => {
                RunStatus::Failed
            }
            BookingError::Browser(_) | BookingError::Panicked(_) => RunStatus::Error,
        }
    }
}

/// Fixed waits between workflow steps, tuned to the site's page transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    /// How long the client-side login route gets to render its form.
    pub login_form_timeout: Duration,
    pub before_rate_selection: Duration,
    pub rate_selection_timeout: Duration,
    pub before_date_selection: Duration,
    pub date_selection_timeout: Duration,
    pub slot_listing_load: Duration,
    pub after_slot_click: Duration,
    pub booking_panel_load: Duration,
    pub selection_register: Duration,
    pub booking_confirmation: Duration,
    /// Keeps the finished page open before closing the browser.
    pub hold_after_run: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            login_form_timeout: Duration::from_secs(30),
            before_rate_selection: Duration::from_secs(2),
            rate_selection_timeout: Duration::from_secs(10),
            before_date_selection: Duration::from_secs(2),
            date_selection_timeout: Duration::from_secs(5),
            slot_listing_load: Duration::from_secs(3),
            after_slot_click: Duration::from_secs(2),
            booking_panel_load: Duration::from_secs(2),
            selection_register: Duration::from_secs(1),
            booking_confirmation: Duration::from_secs(5),
            hold_after_run: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BookingSettings {
    pub login_url: String,
    pub username: String,
    pub password: String,
    pub rate_class: String,
    pub day_offset: u32,
    pub cutoff_minutes: u32,
    pub min_players: u32,
    pub player_selection: PlayerSelection,
    pub diagnostics_dir: PathBuf,
    pub timings: Timings,
}

impl BookingSettings {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login_url: site::DEFAULT_LOGIN_URL.into(),
            username: username.into(),
            password: password.into(),
            rate_class: site::DEFAULT_RATE_CLASS.into(),
            day_offset: calendar::DEFAULT_DAY_OFFSET,
            cutoff_minutes: DEFAULT_CUTOFF_MINUTES,
            min_players: DEFAULT_MIN_PLAYERS,
            player_selection: PlayerSelection::default(),
            diagnostics_dir: PathBuf::from("."),
            timings: Timings::default(),
        }
    }
}

pub fn format_minutes(minutes: u32) -> String {
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// Drives one browser session through the booking workflow.
pub struct TeeTimeBooker<'a, S: BrowserSession + ?Sized> {
    session: &'a S,
    settings: &'a BookingSettings,
    tracker: &'a StepTracker,
}

impl<'a, S: BrowserSession + ?Sized> TeeTimeBooker<'a, S> {
    pub fn new(session: &'a S, settings: &'a BookingSettings, tracker: &'a StepTracker) -> Self {
        Self {
            session,
            settings,
            tracker,
        }
    }

    async fn capture(&self, name: &str) {
        capture(self.session, &self.settings.diagnostics_dir, name).await;
    }

    async fn require(&self, chain: &LocatorChain) -> Result<ElementHandle, BookingError> {
        wait_for_any(self.session, chain, self.settings.timings.login_form_timeout)
            .await?
            .ok_or_else(|| BookingError::not_found(chain))
    }

    pub async fn authenticate(&self) -> Result<(), BookingError> {
        info!(url = %self.settings.login_url, "Navigating to login page");
        self.session.goto(&self.settings.login_url).await?;
        self.session.wait_until_loaded().await?;

        info!("Filling in login credentials");
        let username = self.require(&site::username_field()).await?;
        self.session.fill(&username, &self.settings.username).await?;
        let password = self.require(&site::password_field()).await?;
        self.session.fill(&password, &self.settings.password).await?;

        info!("Clicking sign in button");
        let sign_in = site::sign_in_button();
        let timeout = self.settings.timings.login_form_timeout;
        let appeared = wait_for_any(self.session, &sign_in, timeout).await?.is_some();
        if !appeared
            || click_first(self.session, &sign_in, Duration::ZERO)
                .await?
                .is_none()
        {
            error!("No sign in control matched");
            return Err(BookingError::not_found(&sign_in));
        }

        self.session.wait_until_loaded().await?;
        info!("Login completed");
        Ok(())
    }

    pub async fn select_rate_class(&self) -> Result<(), BookingError> {
        let timings = &self.settings.timings;
        info!(rate_class = %self.settings.rate_class, "Selecting rate class");
        sleep(timings.before_rate_selection).await;

        let chain = site::rate_class_button(&self.settings.rate_class);
        match click_first(self.session, &chain, timings.rate_selection_timeout).await {
            Ok(Some(_)) => info!("Rate class selected"),
            Ok(None) => {
                error!(rate_class = %self.settings.rate_class, "Failed to select rate class");
                self.capture("debug_rate_selection.png").await;
                return Err(BookingError::not_found(&chain));
            }
            Err(err) => {
                error!(?err, "Failed to select rate class");
                self.capture("debug_rate_selection.png").await;
                return Err(err.into());
            }
        }

        self.session.wait_until_loaded().await?;
        Ok(())
    }

    pub async fn select_date(&self, date: NaiveDate) -> Result<(), BookingError> {
        let timings = &self.settings.timings;
        info!(%date, "Selecting date");
        sleep(timings.before_date_selection).await;

        let chain = calendar::date_cell(date);
        match click_first(self.session, &chain, timings.date_selection_timeout).await {
            Ok(Some(locator)) => info!(%locator, "Date selected"),
            Ok(None) => {
                error!(%date, "Could not find date selector");
                self.capture("debug_date_selection.png").await;
                return Err(BookingError::not_found(&chain));
            }
            Err(err) => {
                self.capture("debug_date_selection.png").await;
                return Err(err.into());
            }
        }

        self.session.wait_until_loaded().await?;
        Ok(())
    }

    async fn read_slot(&self, slot: &ElementHandle) -> Result<Option<SlotCandidate>, BrowserError> {
        let Some(time) = self.session.find_within(slot, &site::slot_time()).await? else {
            return Ok(None);
        };
        let time_text = self.session.text(&time).await?;

        let players_text = match self
            .session
            .find_within(slot, &site::slot_available_players())
            .await?
        {
            Some(players) => Some(self.session.text(&players).await?),
            None => None,
        };

        Ok(Some(SlotCandidate::new(&time_text, players_text.as_deref())))
    }

    /// Clicks the first listed slot that satisfies the time and player
    /// constraints.
    pub async fn scan_and_select_slot(&self) -> Result<SlotCandidate, BookingError> {
        info!("Looking for available tee times");
        sleep(self.settings.timings.slot_listing_load).await;
        self.capture("debug_tee_times.png").await;

        let slots = self.session.find_all(&site::tee_time_slots()).await?;
        info!(count = slots.len(), "Found tee time slots");

        let mut listed = Vec::with_capacity(slots.len());
        for slot in slots {
            match self.read_slot(&slot).await {
                Ok(Some(candidate)) => listed.push((slot, candidate)),
                Ok(None) => {}
                Err(err) => warn!(?err, "Error processing tee time slot"),
            }
        }
        let candidates: Vec<SlotCandidate> =
            listed.iter().map(|(_, candidate)| candidate.clone()).collect();

        let mut start = 0;
        while let Some(offset) = select_first_slot(
            &candidates[start..],
            self.settings.cutoff_minutes,
            self.settings.min_players,
        ) {
            let (element, candidate) = &listed[start + offset];
            info!(
                time = %candidate.time_label,
                players = ?candidate.available_players,
                "Found suitable tee time"
            );
            match self.session.click(element).await {
                Ok(()) => {
                    sleep(self.settings.timings.after_slot_click).await;
                    return Ok(candidate.clone());
                }
                Err(BrowserError::WebDriver { error, message }) => {
                    warn!(%error, %message, "Could not open tee time, trying the next one");
                    start += offset + 1;
                }
                Err(err) => return Err(err.into()),
            }
        }

        error!("No suitable tee times found");
        Err(BookingError::NoQualifyingSlot {
            scanned: candidates.len(),
            cutoff: format_minutes(self.settings.cutoff_minutes),
            min_players: self.settings.min_players,
        })
    }

    async fn select_player_count(&self, available_players: u32) -> Result<bool, BrowserError> {
        let buttons = self.session.find_all(&site::player_count_buttons()).await?;
        let texts = match self.settings.player_selection {
            PlayerSelection::Maximum => vec![String::new(); buttons.len()],
            PlayerSelection::MatchAvailable => {
                let mut texts = Vec::with_capacity(buttons.len());
                for button in &buttons {
                    texts.push(self.session.text(button).await?);
                }
                texts
            }
        };

        let Some(index) =
            player_button_index(self.settings.player_selection, &texts, available_players)
        else {
            return Ok(false);
        };
        self.session.click(&buttons[index]).await?;
        Ok(true)
    }

    /// Sets up the opened slot and presses the book control. Every part is
    /// best effort; returns whether the book control was clicked.
    pub async fn configure_and_submit_booking(&self, slot: &SlotCandidate) -> bool {
        let timings = &self.settings.timings;
        info!("Configuring booking details");
        sleep(timings.booking_panel_load).await;

        let available_players = slot.available_players.unwrap_or(self.settings.min_players);
        match self.select_player_count(available_players).await {
            Ok(true) => info!(selection = ?self.settings.player_selection, "Selected player count"),
            Ok(false) => warn!("Could not select players: no player count options"),
            Err(err) => warn!(?err, "Could not select players"),
        }

        match first_present(self.session, &site::no_cart_button()).await {
            Ok(Some(no_cart)) => match self.session.click(&no_cart).await {
                Ok(()) => info!("Selected no carts"),
                Err(err) => warn!(?err, "Could not select cart option"),
            },
            Ok(None) => warn!("Could not select cart option: control not present"),
            Err(err) => warn!(?err, "Could not select cart option"),
        }

        sleep(timings.selection_register).await;

        let book_button = match first_present(self.session, &site::book_button()).await {
            Ok(Some(button)) => button,
            Ok(None) => {
                error!("Could not find Book Time button");
                self.capture("debug_book_button.png").await;
                return false;
            }
            Err(err) => {
                error!(?err, "Error looking for book button");
                self.capture("debug_booking_error.png").await;
                return false;
            }
        };

        if let Err(err) = self.session.click(&book_button).await {
            error!(?err, "Error clicking book button");
            self.capture("debug_booking_error.png").await;
            return false;
        }
        info!("Clicked Book Time button");
        sleep(timings.booking_confirmation).await;
        info!("Tee time booking initiated");
        true
    }

    /// Runs every step in order. No step is retried.
    pub async fn book(&self, now: DateTime<Local>) -> Result<BookedSlot, BookingError> {
        self.tracker.advance(RunStep::Authenticating);
        self.authenticate().await?;

        self.tracker.advance(RunStep::SelectingRate);
        self.select_rate_class().await?;

        self.tracker.advance(RunStep::SelectingDate);
        let date = target_date(now, self.settings.day_offset);
        self.select_date(date).await?;

        self.tracker.advance(RunStep::ScanningSlots);
        let slot = self.scan_and_select_slot().await?;

        self.tracker.advance(RunStep::ConfiguringBooking);
        let submitted = self.configure_and_submit_booking(&slot).await;
        if submitted {
            self.tracker.advance(RunStep::Submitted);
        }

        Ok(BookedSlot {
            date,
            available_players: slot.available_players.unwrap_or_default(),
            time_label: slot.time_label,
            submitted,
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".into()
    }
}

pub fn summarize(outcome: &Result<BookedSlot, BookingError>) -> BookingRun {
    match outcome {
        Ok(slot) if slot.submitted => BookingRun::now(
            RunStatus::Success,
            format!(
                "Booking completed successfully: {} on {}",
                slot.time_label, slot.date
            ),
        ),
        Ok(slot) => BookingRun::now(
            RunStatus::Failed,
            format!(
                "Selected {} on {} but the Book Time button was not available",
                slot.time_label, slot.date
            ),
        ),
        Err(err) if err.status() == RunStatus::Failed => {
            BookingRun::now(RunStatus::Failed, err.to_string())
        }
        Err(err) => BookingRun::now(
            RunStatus::Error,
            format!("Error during booking automation: {err}"),
        ),
    }
}

/// Performs one complete booking attempt. Never fails: every problem ends up
/// in the returned record, and the browser session is closed on every path.
pub async fn run_once<L: BrowserLauncher>(
    launcher: &L,
    settings: &BookingSettings,
    tracker: &StepTracker,
) -> BookingRun {
    let run_id = Uuid::new_v4();
    async move {
        info!("Starting tee time booking automation");
        let session = match launcher.launch().await {
            Ok(session) => session,
            Err(err) => {
                error!(?err, "Failed to start browser");
                tracker.advance(RunStep::Failed);
                return summarize(&Err(err.into()));
            }
        };

        let booker = TeeTimeBooker::new(&session, settings, tracker);
        let outcome = match AssertUnwindSafe(booker.book(Local::now()))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => Err(BookingError::Panicked(panic_message(panic.as_ref()))),
        };

        match &outcome {
            Ok(slot) if slot.submitted => info!("Tee time booking completed successfully"),
            Ok(_) => tracker.advance(RunStep::Failed),
            Err(err) if matches!(err, BookingError::NoQualifyingSlot { .. }) => {
                error!(%err, "Failed to find suitable tee time");
                tracker.advance(RunStep::Failed);
            }
            Err(err) => {
                error!(%err, "An error occurred");
                capture(&session, &settings.diagnostics_dir, "debug_error.png").await;
                tracker.advance(RunStep::Failed);
            }
        }

        if !settings.timings.hold_after_run.is_zero() {
            sleep(settings.timings.hold_after_run).await;
        }
        if let Err(err) = session.close().await {
            warn!(?err, "Failed to close browser session");
        }

        summarize(&outcome)
    }
    .instrument(info_span!("booking_run", %run_id))
    .await
}
