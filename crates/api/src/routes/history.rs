//! ```text
//! GET    /                list_history
//! POST   /{id}/restore    restore_entry
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::history;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(history::list_history))
        .route("/{id}/restore", post(history::restore_entry))
}
