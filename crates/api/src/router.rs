//! HTTP surface of the studio server.
//!
//! [`build_app_router`] is shared by `main.rs` and the integration tests
//! so both exercise the same routes and layers.

use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, StatusCode, Uri};
use axum::Router;
use studio_core::error::CoreError;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::routes;
use crate::state::AppState;

/// Correlates a request with its log lines; echoed on every response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The studio routes wrapped in the server's middleware.
///
/// `/health` sits at the root; the studio API (including the WebSocket
/// upgrade) lives under `/api/v1`. Unmatched paths get the same JSON
/// error body as every other failure.
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let studio = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .fallback(unknown_route);

    with_middleware(studio, config).with_state(state)
}

/// Outermost first: CORS, request id, tracing, id propagation, timeout,
/// panic recovery.
fn with_middleware(router: Router<AppState>, config: &ServerConfig) -> Router<AppState> {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let timeout = Duration::from_secs(config.request_timeout_secs);

    router
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .layer(build_cors_layer(config))
}

async fn unknown_route(uri: Uri) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Route",
        id: uri.path().to_string(),
    })
}

/// CORS for the studio UI origins.
///
/// The UI only reads and posts JSON, and reads the request id back for
/// error reports. Panics at startup on an unparseable origin.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .max_age(Duration::from_secs(3600))
}
