//! ```text
//! POST   /               start_generation
//! POST   /abort          abort_generation
//! GET    /status         get_status
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(generation::start_generation))
        .route("/abort", post(generation::abort_generation))
        .route("/status", get(generation::get_status))
}
