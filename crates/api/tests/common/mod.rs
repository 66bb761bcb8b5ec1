#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use studio_api::config::ServerConfig;
use studio_api::router::build_app_router;
use studio_api::state::AppState;
use studio_events::InProcessChannel;
use studio_pipeline::GenerationStatus;
use studio_remote::{AttemptPlan, RemoteCallSimulator, ScriptedStrategy};
use studio_store::MemoryMedium;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        data_dir: "./data".into(),
        failure_rate: 0.0,
        min_latency_ms: 0,
        max_latency_ms: 0,
        max_attempts: 3,
        sync_interval_ms: 1000,
    }
}

/// Build the full application router over an in-memory medium and a
/// scripted simulator. Returns the state as well so tests can observe
/// the controller directly.
pub fn build_test_app_with(strategy: ScriptedStrategy) -> (Router, AppState) {
    let config = test_config();
    let state = AppState::new(
        config.clone(),
        Arc::new(MemoryMedium::new()),
        Arc::new(InProcessChannel::new()),
        RemoteCallSimulator::new(strategy),
    );
    (build_app_router(state.clone(), &config), state)
}

/// Every simulated call succeeds instantly.
pub fn build_test_app() -> (Router, AppState) {
    build_test_app_with(ScriptedStrategy::always(AttemptPlan::succeed(Duration::ZERO)))
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Wait for the controller to reach a terminal phase.
pub async fn wait_until_settled(state: &AppState) -> GenerationStatus {
    let mut rx = state.controller.subscribe_status();
    let status = tokio::time::timeout(
        Duration::from_secs(30),
        rx.wait_for(|s| s.phase.is_terminal()),
    )
    .await
    .expect("generation did not settle")
    .expect("status channel closed")
    .clone();
    status
}
