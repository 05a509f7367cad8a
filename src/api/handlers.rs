//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::{
    error::{ControlError, TimerError},
    state::AppState,
};
use super::responses::{ApiResponse, HealthResponse, StartRequest, StatusResponse};

/// Map a control failure to the HTTP status returned to the caller
fn error_status(e: &ControlError) -> StatusCode {
    match e {
        ControlError::Timer(TimerError::InvalidDuration(_)) => StatusCode::BAD_REQUEST,
        ControlError::DriverUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Handle POST /start - Start or restart the countdown
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartRequest>,
) -> Result<Json<ApiResponse>, StatusCode> {
    let Ok(duration) = u64::try_from(request.duration) else {
        warn!("Rejected start request: {}", TimerError::InvalidDuration(request.duration));
        return Err(StatusCode::BAD_REQUEST);
    };

    match state.start(duration).await {
        Ok(snapshot) => {
            info!("Start endpoint called - countdown running for {}s", duration);
            Ok(Json(ApiResponse::new(
                format!("Countdown started for {}s", duration),
                snapshot,
            )))
        }
        Err(e) => {
            warn!("Failed to start countdown: {}", e);
            Err(error_status(&e))
        }
    }
}

/// Handle POST /pause - Pause a running countdown
pub async fn pause_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse>, StatusCode> {
    match state.pause().await {
        Ok(snapshot) => {
            info!("Pause endpoint called - countdown {}", snapshot.state);
            Ok(Json(ApiResponse::new(
                format!("Countdown {} with {}s remaining", snapshot.state, snapshot.remaining),
                snapshot,
            )))
        }
        Err(e) => {
            error!("Failed to pause countdown: {}", e);
            Err(error_status(&e))
        }
    }
}

/// Handle POST /resume - Resume a paused countdown
pub async fn resume_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse>, StatusCode> {
    match state.resume().await {
        Ok(snapshot) => {
            info!("Resume endpoint called - countdown {}", snapshot.state);
            Ok(Json(ApiResponse::new(
                format!("Countdown {} with {}s remaining", snapshot.state, snapshot.remaining),
                snapshot,
            )))
        }
        Err(e) => {
            error!("Failed to resume countdown: {}", e);
            Err(error_status(&e))
        }
    }
}

/// Handle POST /stop - Stop the countdown and reset it
pub async fn stop_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse>, StatusCode> {
    match state.stop().await {
        Ok(snapshot) => {
            info!("Stop endpoint called - countdown reset");
            Ok(Json(ApiResponse::new("Countdown stopped".to_string(), snapshot)))
        }
        Err(e) => {
            error!("Failed to stop countdown: {}", e);
            Err(error_status(&e))
        }
    }
}

/// Handle GET /status - Return current timer and server status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        timer: state.get_snapshot(),
        tick_interval_ms: state.tick_interval.as_millis() as u64,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
