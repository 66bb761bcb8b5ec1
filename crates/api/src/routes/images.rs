use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use studio_core::imaging::MAX_FILE_SIZE;

use crate::handlers::images;
use crate::state::AppState;

/// Request body cap for uploads: the file limit plus multipart framing.
const MAX_UPLOAD_BODY: usize = MAX_FILE_SIZE + 64 * 1024;

/// ```text
/// POST   /    upload_image (multipart, field `file`)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(images::upload_image))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY))
}
