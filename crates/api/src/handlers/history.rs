use axum::extract::{Path, State};
use axum::Json;
use studio_core::error::CoreError;
use studio_core::generation::{GenerationRequest, HistoryEntry};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/history
///
/// Most-recent-first, at most five entries.
pub async fn list_history(State(state): State<AppState>) -> Json<DataResponse<Vec<HistoryEntry>>> {
    Json(DataResponse {
        data: state.history.entries(),
    })
}

/// POST /api/v1/history/{id}/restore
///
/// Returns the request that reproduces the entry, for prefilling the form.
pub async fn restore_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<GenerationRequest>>> {
    let request = state.controller.restore(&id).ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "HistoryEntry",
            id,
        })
    })?;

    Ok(Json(DataResponse { data: request }))
}
