pub mod generation;
pub mod health;
pub mod history;
pub mod images;
pub mod styles;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                         WebSocket (status + lifecycle events)
///
/// /styles                     style catalog
/// /images                     reference image upload (POST, multipart)
///
/// /generations                start (POST)
/// /generations/abort          abort (POST)
/// /generations/status         current status
///
/// /history                    list
/// /history/{id}/restore       request prefill (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/styles", styles::router())
        .nest("/images", images::router())
        .nest("/generations", generation::router())
        .nest("/history", history::router())
}
