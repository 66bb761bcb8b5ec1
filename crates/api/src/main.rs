use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use studio_events::InProcessChannel;
use studio_remote::RemoteCallSimulator;
use studio_store::{FileMedium, MediumPoller, HISTORY_STORAGE_KEY};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studio_api::config::ServerConfig;
use studio_api::router::build_app_router;
use studio_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studio_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Storage ---
    let medium = Arc::new(
        FileMedium::open(config.data_dir.clone()).expect("Failed to open data directory"),
    );
    let channel = Arc::new(InProcessChannel::new());
    tracing::info!(data_dir = %config.data_dir.display(), "Storage medium opened");

    // --- App state ---
    let simulator = RemoteCallSimulator::new(config.simulation_strategy());
    let state = AppState::new(config.clone(), medium.clone(), channel.clone(), simulator);
    tracing::info!(
        entries = state.history.entries().len(),
        max_attempts = state.controller.policy().max_attempts,
        "Generation controller ready",
    );

    // Picks up history written by other processes sharing the data dir.
    let poller_cancel = CancellationToken::new();
    let poller = MediumPoller::new(
        medium,
        channel,
        &[HISTORY_STORAGE_KEY],
        config.sync_interval(),
    );
    let poller_handle = tokio::spawn(poller.run(poller_cancel.clone()));

    // --- Router ---
    let app = build_app_router(state.clone(), &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if state.controller.abort() {
        tracing::info!("Aborted in-flight generation");
    }

    poller_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), poller_handle).await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
