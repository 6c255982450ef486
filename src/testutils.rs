use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
use tokio::{sync::Notify, time::Instant};

use crate::{
    backend::{BookingBackend, TriggerOutcome},
    booker::{BookingSettings, Timings},
    browser::{BrowserError, BrowserLauncher, BrowserSession, ElementHandle},
    calendar,
    configuration::Configuration,
    locator::Locator,
    site,
    types::{BookingRun, RunStep},
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Date the scripted tee sheet offers: five days after 2026-10-18.
pub const SHEET_DATE: (i32, u32, u32) = (2026, 10, 23);

/// Static page model. Elements are keyed by the exact locator that finds them.
#[derive(Default, Clone)]
pub struct MockPage {
    top_level: HashMap<Locator, Vec<ElementHandle>>,
    nested: HashMap<(ElementHandle, Locator), Vec<ElementHandle>>,
    texts: HashMap<ElementHandle, String>,
    rejected_clicks: HashSet<ElementHandle>,
    panicking_clicks: HashSet<ElementHandle>,
    broken_locators: HashSet<Locator>,
    render_delays: HashMap<ElementHandle, Duration>,
}

impl MockPage {
    pub fn element(&mut self, locator: Locator, id: &str, text: &str) -> ElementHandle {
        let handle = ElementHandle(id.into());
        self.top_level
            .entry(locator)
            .or_default()
            .push(handle.clone());
        self.texts.insert(handle.clone(), text.into());
        handle
    }

    pub fn child(&mut self, parent: &ElementHandle, locator: Locator, id: &str, text: &str) {
        let handle = ElementHandle(id.into());
        self.nested
            .entry((parent.clone(), locator))
            .or_default()
            .push(handle.clone());
        self.texts.insert(handle, text.into());
    }

    /// Clicking `id` fails like an element the driver can't interact with.
    pub fn reject_click(&mut self, id: &str) {
        self.rejected_clicks.insert(ElementHandle(id.into()));
    }

    pub fn panic_on_click(&mut self, id: &str) {
        self.panicking_clicks.insert(ElementHandle(id.into()));
    }

    /// `id` only shows up once `delay` has passed since the last navigation,
    /// like markup rendered by client-side script.
    pub fn appear_after(&mut self, id: &str, delay: Duration) {
        self.render_delays.insert(ElementHandle(id.into()), delay);
    }

    /// Looking up `locator` fails like a dropped driver connection.
    pub fn break_locator(&mut self, locator: Locator) {
        self.broken_locators.insert(locator);
    }
}

/// A complete booking site: login form, rate class, the calendar day of
/// [`SHEET_DATE`], the given tee time listing and the booking panel.
pub fn tee_sheet(slots: &[(&str, Option<&str>)]) -> MockPage {
    let (year, month, day) = SHEET_DATE;
    tee_sheet_on(NaiveDate::from_ymd_opt(year, month, day).unwrap(), slots)
}

/// Like [`tee_sheet`], offering the day a run started now books.
pub fn current_tee_sheet(slots: &[(&str, Option<&str>)]) -> MockPage {
    tee_sheet_on(
        calendar::target_date(Local::now(), calendar::DEFAULT_DAY_OFFSET),
        slots,
    )
}

pub fn tee_sheet_on(date: NaiveDate, slots: &[(&str, Option<&str>)]) -> MockPage {
    let mut page = MockPage::default();
    page.element(site::username_field().candidates()[0].clone(), "username", "");
    page.element(site::password_field().candidates()[0].clone(), "password", "");
    page.element(site::sign_in_button().candidates()[0].clone(), "sign-in", "Sign In");
    page.element(
        site::rate_class_button(site::DEFAULT_RATE_CLASS).candidates()[0].clone(),
        "rate",
        site::DEFAULT_RATE_CLASS,
    );

    page.element(
        calendar::date_cell(date).candidates()[0].clone(),
        &format!("day-{}", date.day()),
        &date.day().to_string(),
    );

    for (index, (time, players)) in slots.iter().enumerate() {
        let slot = page.element(site::tee_time_slots(), &format!("slot-{index}"), "");
        page.child(&slot, site::slot_time(), &format!("time-{index}"), time);
        if let Some(players) = players {
            page.child(
                &slot,
                site::slot_available_players(),
                &format!("free-{index}"),
                players,
            );
        }
    }

    for count in 1..=4 {
        page.element(
            site::player_count_buttons(),
            &format!("players-{count}"),
            &count.to_string(),
        );
    }
    page.element(site::no_cart_button().candidates()[0].clone(), "no-cart", "No");
    page.element(site::book_button().candidates()[0].clone(), "book", "Book Time");
    page
}

/// Settings that never wait, for runs on real time.
pub fn instant_settings(diagnostics_dir: &Path) -> BookingSettings {
    let mut settings = BookingSettings::new("golfer@example.com", "secret");
    settings.diagnostics_dir = diagnostics_dir.to_path_buf();
    settings.timings = Timings {
        login_form_timeout: Duration::ZERO,
        before_rate_selection: Duration::ZERO,
        rate_selection_timeout: Duration::ZERO,
        before_date_selection: Duration::ZERO,
        date_selection_timeout: Duration::ZERO,
        slot_listing_load: Duration::ZERO,
        after_slot_click: Duration::ZERO,
        booking_panel_load: Duration::ZERO,
        selection_register: Duration::ZERO,
        booking_confirmation: Duration::ZERO,
        hold_after_run: Duration::ZERO,
    };
    settings
}

pub struct MockBrowserInner {
    page: MockPage,
    pub calls_to_close: AtomicU64,
    pub calls_to_screenshot: AtomicU64,
    visited: Mutex<Vec<String>>,
    filled: Mutex<Vec<(String, String)>>,
    clicked: Mutex<Vec<String>>,
    loaded_at: Mutex<Instant>,
}

#[derive(Clone)]
pub struct MockBrowser(pub Arc<MockBrowserInner>);

impl MockBrowser {
    pub const SCREENSHOT: &'static [u8] = b"\x89PNG\r\n\x1a\nmock";

    pub fn new(page: MockPage) -> Self {
        Self(Arc::new(MockBrowserInner {
            page,
            calls_to_close: AtomicU64::default(),
            calls_to_screenshot: AtomicU64::default(),
            visited: Mutex::default(),
            filled: Mutex::default(),
            clicked: Mutex::default(),
            loaded_at: Mutex::new(Instant::now()),
        }))
    }

    pub fn visited(&self) -> Vec<String> {
        lock(&self.0.visited).clone()
    }

    pub fn filled(&self) -> Vec<(String, String)> {
        lock(&self.0.filled).clone()
    }

    pub fn clicked(&self) -> Vec<String> {
        lock(&self.0.clicked).clone()
    }

    pub fn closes(&self) -> u64 {
        self.0.calls_to_close.load(Ordering::SeqCst)
    }

    pub fn screenshots(&self) -> u64 {
        self.0.calls_to_screenshot.load(Ordering::SeqCst)
    }

    fn rendered(&self, handles: Option<&Vec<ElementHandle>>) -> Vec<ElementHandle> {
        let elapsed = lock(&self.0.loaded_at).elapsed();
        handles
            .into_iter()
            .flatten()
            .filter(|handle| {
                self.0
                    .page
                    .render_delays
                    .get(*handle)
                    .map_or(true, |delay| elapsed >= *delay)
            })
            .cloned()
            .collect()
    }

    fn check(&self, locator: &Locator) -> Result<(), BrowserError> {
        if self.0.page.broken_locators.contains(locator) {
            return Err(BrowserError::Protocol("connection reset by driver".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for MockBrowser {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        lock(&self.0.visited).push(url.into());
        *lock(&self.0.loaded_at) = Instant::now();
        Ok(())
    }

    async fn wait_until_loaded(&self) -> Result<(), BrowserError> {
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>, BrowserError> {
        self.check(locator)?;
        Ok(self.rendered(self.0.page.top_level.get(locator)))
    }

    async fn find_all_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        self.check(locator)?;
        Ok(self.rendered(
            self.0.page.nested.get(&(parent.clone(), locator.clone())),
        ))
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        if self.0.page.panicking_clicks.contains(element) {
            panic!("mock click on {} exploded", element.0);
        }
        if self.0.page.rejected_clicks.contains(element) {
            return Err(BrowserError::WebDriver {
                error: "element not interactable".into(),
                message: format!("{} is covered", element.0),
            });
        }
        lock(&self.0.clicked).push(element.0.clone());
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, text: &str) -> Result<(), BrowserError> {
        lock(&self.0.filled).push((element.0.clone(), text.into()));
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        Ok(self.0.page.texts.get(element).cloned().unwrap_or_default())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        self.0.calls_to_screenshot.fetch_add(1, Ordering::SeqCst);
        Ok(Self::SCREENSHOT.to_vec())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.0.calls_to_close.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockLauncherInner {
    browser: MockBrowser,
    fail: bool,
    gate: Option<Arc<Notify>>,
    pub calls_to_launch: AtomicU64,
}

/// Hands out the same [`MockBrowser`] on every launch so tests can inspect it.
#[derive(Clone)]
pub struct MockLauncher(pub Arc<MockLauncherInner>);

impl MockLauncher {
    fn build(page: MockPage, fail: bool, gate: Option<Arc<Notify>>) -> Self {
        Self(Arc::new(MockLauncherInner {
            browser: MockBrowser::new(page),
            fail,
            gate,
            calls_to_launch: AtomicU64::default(),
        }))
    }

    pub fn new(page: MockPage) -> Self {
        Self::build(page, false, None)
    }

    pub fn failing() -> Self {
        Self::build(MockPage::default(), true, None)
    }

    /// Launches only complete once `gate` is notified, holding the run open.
    pub fn gated(page: MockPage, gate: Arc<Notify>) -> Self {
        Self::build(page, false, Some(gate))
    }

    pub fn browser(&self) -> &MockBrowser {
        &self.0.browser
    }

    pub fn launches(&self) -> u64 {
        self.0.calls_to_launch.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    type Session = MockBrowser;

    async fn launch(&self) -> Result<MockBrowser, BrowserError> {
        self.0.calls_to_launch.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.0.gate {
            gate.notified().await;
        }
        if self.0.fail {
            return Err(BrowserError::Protocol("session not created".into()));
        }
        Ok(self.0.browser.clone())
    }
}

pub struct MockBookingBackendInner {
    pub busy: AtomicBool,
    pub calls_to_trigger_run: AtomicU64,
    pub last_result: Mutex<BookingRun>,
}

#[derive(Clone)]
pub struct MockBookingBackend(pub Arc<MockBookingBackendInner>);

impl MockBookingBackendInner {
    fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
            calls_to_trigger_run: AtomicU64::default(),
            last_result: Mutex::new(BookingRun::idle()),
        }
    }
}

impl MockBookingBackend {
    pub fn new() -> Self {
        Self(Arc::new(MockBookingBackendInner::new()))
    }
}

impl BookingBackend for MockBookingBackend {
    fn trigger_run(&self) -> TriggerOutcome {
        self.0.calls_to_trigger_run.fetch_add(1, Ordering::SeqCst);
        if self.0.busy.swap(true, Ordering::SeqCst) {
            TriggerOutcome::AlreadyRunning
        } else {
            TriggerOutcome::Started
        }
    }

    fn in_progress(&self) -> bool {
        self.0.busy.load(Ordering::SeqCst)
    }

    fn last_result(&self) -> BookingRun {
        lock(&self.0.last_result).clone()
    }

    fn current_step(&self) -> RunStep {
        if self.in_progress() {
            RunStep::Authenticating
        } else {
            RunStep::Idle
        }
    }
}

#[derive(Clone)]
pub struct MockConfiguration {
    pub day_offset: u32,
}

impl Configuration for MockConfiguration {
    fn service_name(&self) -> String {
        "Tee Time Booking Automation".into()
    }

    fn bind_address(&self) -> String {
        "127.0.0.1:0".into()
    }

    fn webdriver_url(&self) -> String {
        "http://localhost:4444".into()
    }

    fn headless(&self) -> bool {
        true
    }

    fn booking_settings(&self) -> BookingSettings {
        let mut settings = BookingSettings::new("golfer@example.com", "secret");
        settings.day_offset = self.day_offset;
        settings
    }
}
