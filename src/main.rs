use std::process::ExitCode;

use crate::{
    booker::run_once, booking_service::BookingService, configuration::Configuration,
    configuration_handler::ConfigurationHandler, http::create_app, state_store::StepTracker,
    types::RunStatus, webdriver::WebDriverLauncher,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod backend;
mod booker;
mod booking_service;
mod browser;
mod calendar;
mod configuration;
mod configuration_handler;
mod http;
mod locator;
mod page;
mod site;
mod slot_selection;
mod state_store;
#[cfg(test)]
mod testutils;
mod types;
mod webdriver;

#[tokio::main]
async fn main() -> ExitCode {
    let configuration = ConfigurationHandler::parse_arguments();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(configuration.log_filter())),
        )
        .init();

    let launcher =
        match WebDriverLauncher::new(configuration.webdriver_url(), configuration.headless()) {
            Ok(launcher) => launcher,
            Err(err) => {
                error!(?err, "Failed to set up the WebDriver client");
                return ExitCode::FAILURE;
            }
        };
    let settings = configuration.booking_settings();

    if configuration.once() {
        let run = run_once(&launcher, &settings, &StepTracker::detached()).await;
        info!(status = ?run.status, message = %run.message, "Booking run finished");
        return if run.status == RunStatus::Success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    let address = configuration.bind_address();
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(?err, "Failed to bind {address}");
            return ExitCode::FAILURE;
        }
    };
    info!("{} accessible at {address}", configuration.service_name());

    let backend = BookingService::new(launcher, settings);
    let app = create_app(backend, configuration);

    if let Err(err) = axum::serve(listener, app).await {
        error!(?err, "Server stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
