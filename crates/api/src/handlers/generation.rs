//! Handlers for the generation lifecycle.
//!
//! Routes:
//! - `POST /generations`          start a generation in the background
//! - `POST /generations/abort`    abort the active generation
//! - `GET  /generations/status`   current status snapshot

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use studio_core::generation::GenerationRequest;
use studio_pipeline::GenerationStatus;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Result of an abort request.
#[derive(Debug, Serialize)]
pub struct AbortResponse {
    /// `false` when nothing was running or it was already aborted.
    pub aborted: bool,
}

/// POST /api/v1/generations
///
/// Validates the request and starts the invocation on a background task.
/// Progress is observed through `/generations/status` or the WebSocket.
pub async fn start_generation(
    State(state): State<AppState>,
    Json(request): Json<GenerationRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<GenerationStatus>>)> {
    // The task is detached; its outcome lands in the status channel.
    let _task = state.controller.spawn(request)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: state.controller.status(),
        }),
    ))
}

/// POST /api/v1/generations/abort
pub async fn abort_generation(State(state): State<AppState>) -> Json<DataResponse<AbortResponse>> {
    let aborted = state.controller.abort();
    Json(DataResponse {
        data: AbortResponse { aborted },
    })
}

/// GET /api/v1/generations/status
pub async fn get_status(State(state): State<AppState>) -> Json<DataResponse<GenerationStatus>> {
    Json(DataResponse {
        data: state.controller.status(),
    })
}
