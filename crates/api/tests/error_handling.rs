//! Tests for `AppError` → HTTP response mapping.
//!
//! These call `IntoResponse` directly on `AppError` values; no server
//! is involved.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use http_body_util::BodyExt;
use studio_api::error::AppError;
use studio_core::error::CoreError;
use studio_pipeline::GenerationError;

/// Convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// CoreError
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "HistoryEntry",
        id: "gen_1".into(),
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "HistoryEntry with id gen_1 not found");
}

#[tokio::test]
async fn image_error_returns_422() {
    let err = AppError::Core(CoreError::Image("Failed to read image".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "IMAGE_ERROR");
}

#[tokio::test]
async fn internal_core_error_is_sanitized() {
    let err = AppError::Core(CoreError::Internal("disk layout leaked".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// GenerationError
// ---------------------------------------------------------------------------

#[tokio::test]
async fn already_running_returns_409() {
    let (status, json) = error_to_response(GenerationError::AlreadyRunning.into()).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "ALREADY_RUNNING");
}

#[tokio::test]
async fn invalid_input_returns_400_with_plain_message() {
    let err = GenerationError::InvalidInput("Please upload an image and enter a prompt".into());

    let (status, json) = error_to_response(err.into()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["error"], "Please upload an image and enter a prompt");
}

#[tokio::test]
async fn exhausted_returns_503() {
    let err = GenerationError::Exhausted {
        attempts: 3,
        last_error: "Model overloaded".into(),
    };

    let (status, json) = error_to_response(err.into()).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "Failed after 3 attempts: Model overloaded");
}

// ---------------------------------------------------------------------------
// HTTP-specific
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bad_request_error_returns_400() {
    let (status, json) = error_to_response(AppError::BadRequest("bad field".into())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "bad field");
}
