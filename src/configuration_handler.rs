use crate::booker::{BookingSettings, Timings};
use crate::calendar::DEFAULT_DAY_OFFSET;
use crate::configuration::Configuration;
use crate::site::{DEFAULT_LOGIN_URL, DEFAULT_RATE_CLASS};
use crate::slot_selection::{parse_time_of_day, PlayerSelection};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

fn parse_start_time(value: &str) -> Result<u32, String> {
    parse_time_of_day(value)
        .ok_or_else(|| format!("`{value}` is not a time, expected e.g. `10:30` or `10:30 AM`"))
}

/// Books a tee time on the club's online tee sheet, on demand or from a cron
/// trigger.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct ConfigurationHandler {
    /// Address the HTTP service listens on
    #[arg(long, env = "BOOKER_HOST", default_value = "0.0.0.0")]
    host: String,

    #[arg(long, env = "BOOKER_PORT", default_value_t = 5000)]
    port: u16,

    /// WebDriver endpoint, e.g. a running chromedriver
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:4444")]
    webdriver_url: String,

    /// Show the browser window instead of running headless
    #[arg(long, env = "BOOKER_HEADED")]
    headed: bool,

    #[arg(long, env = "BOOKING_LOGIN_URL", default_value = DEFAULT_LOGIN_URL)]
    login_url: String,

    #[arg(long, env = "BOOKING_USERNAME")]
    username: String,

    #[arg(long, env = "BOOKING_PASSWORD", hide_env_values = true)]
    password: String,

    /// Visible text of the rate class button
    #[arg(long, env = "BOOKING_RATE_CLASS", default_value = DEFAULT_RATE_CLASS)]
    rate_class: String,

    /// Days ahead of today to book
    #[arg(long, env = "BOOKING_DAY_OFFSET", default_value_t = DEFAULT_DAY_OFFSET)]
    day_offset: u32,

    /// Only tee times starting before this time qualify
    #[arg(long, env = "BOOKING_LATEST_START", default_value = "10:30", value_parser = parse_start_time)]
    latest_start: u32,

    /// Minimum number of free player spots a tee time needs
    #[arg(long, env = "BOOKING_MIN_PLAYERS", default_value_t = 2)]
    min_players: u32,

    #[arg(long, env = "BOOKING_PLAYER_SELECTION", value_enum, default_value_t = PlayerSelection::Maximum)]
    player_selection: PlayerSelection,

    /// Where diagnostic screenshots are written
    #[arg(long, env = "DIAGNOSTICS_DIR", default_value = ".")]
    diagnostics_dir: PathBuf,

    /// Seconds the browser stays open after a run
    #[arg(long, env = "HOLD_AFTER_RUN_SECS", default_value_t = 10)]
    hold_after_run_secs: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_filter: String,

    /// Run a single booking attempt and exit instead of serving HTTP
    #[arg(long)]
    once: bool,
}

impl ConfigurationHandler {
    pub fn parse_arguments() -> Self {
        dotenvy::dotenv().ok();
        Self::parse()
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    pub fn once(&self) -> bool {
        self.once
    }
}

impl Configuration for ConfigurationHandler {
    fn service_name(&self) -> String {
        "Tee Time Booking Automation".into()
    }

    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn webdriver_url(&self) -> String {
        self.webdriver_url.clone()
    }

    fn headless(&self) -> bool {
        !self.headed
    }

    fn booking_settings(&self) -> BookingSettings {
        BookingSettings {
            login_url: self.login_url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            rate_class: self.rate_class.clone(),
            day_offset: self.day_offset,
            cutoff_minutes: self.latest_start,
            min_players: self.min_players,
            player_selection: self.player_selection,
            diagnostics_dir: self.diagnostics_dir.clone(),
            timings: Timings {
                hold_after_run: Duration::from_secs(self.hold_after_run_secs),
                ..Timings::default()
            },
        }
    }
}
