use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use studio_core::error::CoreError;
use studio_pipeline::GenerationError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain errors and adds HTTP-specific variants. Implements
/// [`IntoResponse`] to produce consistent `{ "error", "code" }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `studio_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A rejected or failed generation.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { .. } => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", core.message())
                }
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Image(msg) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "IMAGE_ERROR",
                    msg.clone(),
                ),
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            AppError::Generation(err) => match err {
                GenerationError::InvalidInput(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                GenerationError::AlreadyRunning => {
                    (StatusCode::CONFLICT, "ALREADY_RUNNING", err.to_string())
                }
                GenerationError::Cancelled => {
                    (StatusCode::CONFLICT, "CANCELLED", err.to_string())
                }
                GenerationError::Exhausted { .. } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "GENERATION_FAILED",
                    err.to_string(),
                ),
            },

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
