use crate::backend::{BookingBackend, TriggerOutcome};
use crate::calendar::target_date;
use crate::configuration::Configuration;
use crate::types::{BookingRun, RunStep};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const HEALTH_SERVICE_ID: &str = "tee-time-booking-automation";

#[derive(Clone)]
pub struct AppState<T: BookingBackend, C: Configuration> {
    backend: T,
    configuration: C,
}

#[derive(Debug, Deserialize)]
struct RunQuery {
    test: Option<String>,
}

impl RunQuery {
    fn test_mode(&self) -> bool {
        self.test
            .as_deref()
            .is_some_and(|test| test.eq_ignore_ascii_case("true"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Endpoints {
    #[serde(rename = "/run")]
    run: String,
    #[serde(rename = "/status")]
    status: String,
    #[serde(rename = "/health")]
    health: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ServiceInfo {
    service: String,
    status: String,
    endpoints: Endpoints,
    last_booking: BookingRun,
}

#[derive(Debug, Serialize, Deserialize)]
struct RunResponse {
    status: String,
    message: String,
    timestamp: DateTime<Local>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_booking_date: Option<String>,
}

impl RunResponse {
    fn new(status: &str, message: &str) -> Self {
        Self {
            status: status.into(),
            message: message.into(),
            timestamp: Local::now(),
            next_booking_date: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StatusResponse {
    booking_in_progress: bool,
    current_step: RunStep,
    last_result: BookingRun,
    current_time: DateTime<Local>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HealthResponse {
    status: String,
    service: String,
    timestamp: DateTime<Local>,
}

pub fn create_app<T: BookingBackend, C: Configuration>(backend: T, configuration: C) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState {
        backend,
        configuration,
    };

    Router::new()
        .route("/", get(service_info))
        .route("/run", get(run_booking).post(run_booking))
        .route("/status", get(booking_status))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn service_info<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
) -> impl IntoResponse {
    Json(ServiceInfo {
        service: state.configuration.service_name(),
        status: "online".into(),
        endpoints: Endpoints {
            run: "Trigger tee time booking".into(),
            status: "Check booking status".into(),
            health: "Health check".into(),
        },
        last_booking: state.backend.last_result(),
    })
}

async fn run_booking<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
    Query(query): Query<RunQuery>,
) -> impl IntoResponse {
    let already_running = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(RunResponse::new(
            "already_running",
            "Booking automation is already in progress",
        )),
    );

    if state.backend.in_progress() {
        warn!("Run requested while a booking is in progress");
        return already_running;
    }

    if query.test_mode() {
        let next_booking_date = target_date(Local::now(), state.configuration.day_offset());
        info!(%next_booking_date, "Test run requested");
        let mut response = RunResponse::new(
            "test_success",
            "Test mode - booking automation would run here",
        );
        response.next_booking_date = Some(next_booking_date.format("%Y-%m-%d").to_string());
        return (StatusCode::OK, Json(response));
    }

    match state.backend.trigger_run() {
        TriggerOutcome::Started => {
            info!("Booking run triggered");
            (
                StatusCode::OK,
                Json(RunResponse::new(
                    "started",
                    "Tee time booking automation started",
                )),
            )
        }
        TriggerOutcome::AlreadyRunning => already_running,
    }
}

async fn booking_status<T: BookingBackend, C: Configuration>(
    State(state): State<AppState<T, C>>,
) -> impl IntoResponse {
    Json(StatusResponse {
        booking_in_progress: state.backend.in_progress(),
        current_step: state.backend.current_step(),
        last_result: state.backend.last_result(),
        current_time: Local::now(),
    })
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".into(),
        service: HEALTH_SERVICE_ID.into(),
        timestamp: Local::now(),
    })
}
