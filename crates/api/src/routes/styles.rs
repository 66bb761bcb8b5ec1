use axum::routing::get;
use axum::Router;

use crate::handlers::styles;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(styles::list_styles))
}
