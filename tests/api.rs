use std::{sync::Arc, time::Duration};

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use countdown_timer::{
    api::responses::{ApiResponse, HealthResponse, StatusResponse},
    create_router, AppState, TimerEvent, TimerStatus,
};
use serde::de::DeserializeOwned;
use tower::ServiceExt;

fn spawn_app() -> (Router, Arc<AppState>) {
    let (state, driver) = AppState::new(
        20554,
        "127.0.0.1".to_string(),
        Duration::from_secs(1),
        None,
    );
    tokio::spawn(driver.run());
    let state = Arc::new(state);
    (create_router(Arc::clone(&state)), state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_start_pause_resume_stop() {
    let (app, state) = spawn_app();
    let mut events = state.subscribe_events();

    let (status, body) = send(&app, "POST", "/start", Some(r#"{"duration": 5}"#)).await;
    assert_eq!(status, StatusCode::OK);
    let response: ApiResponse = parse(&body);
    assert_eq!(response.status, "running");
    assert_eq!(response.timer.remaining, 5);

    assert_eq!(events.recv().await.unwrap(), TimerEvent::Tick { remaining: 4 });

    let (status, body) = send(&app, "POST", "/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    let response: ApiResponse = parse(&body);
    assert_eq!(response.status, "paused");
    assert_eq!(response.timer.remaining, 4);

    let (_, body) = send(&app, "POST", "/resume", None).await;
    let response: ApiResponse = parse(&body);
    assert_eq!(response.timer.state, TimerStatus::Running);

    let (_, body) = send(&app, "POST", "/stop", None).await;
    let response: ApiResponse = parse(&body);
    assert_eq!(response.status, "idle");
    assert_eq!(response.timer.remaining, 0);

    // stopping again changes nothing
    let (status, body) = send(&app, "POST", "/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    let again: ApiResponse = parse(&body);
    assert_eq!(again.timer, response.timer);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_durations_rejected() {
    let (app, state) = spawn_app();

    let (status, _) = send(&app, "POST", "/start", Some(r#"{"duration": 0}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/start", Some(r#"{"duration": -4}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(state.get_snapshot().state, TimerStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_status_reports_expiry() {
    let (app, state) = spawn_app();
    let mut snapshots = state.watch_snapshots();

    send(&app, "POST", "/start", Some(r#"{"duration": 2}"#)).await;
    snapshots
        .wait_for(|s| s.state == TimerStatus::Expired)
        .await
        .unwrap();

    let (status, body) = send(&app, "GET", "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    let response: StatusResponse = parse(&body);
    assert_eq!(response.timer.state, TimerStatus::Expired);
    assert_eq!(response.timer.completed_cycles, 1);
    assert_eq!(response.tick_interval_ms, 1000);
    assert_eq!(response.port, 20554);
    assert_eq!(response.last_action.as_deref(), Some("start"));

    // resuming an expired countdown is a no-op
    let (_, body) = send(&app, "POST", "/resume", None).await;
    let response: ApiResponse = parse(&body);
    assert_eq!(response.status, "expired");
}

#[tokio::test]
async fn test_health() {
    let (app, _state) = spawn_app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let response: HealthResponse = parse(&body);
    assert_eq!(response.status, "ok");
}
