use std::sync::Arc;

use studio_events::{ChangeChannel, EventBus};
use studio_pipeline::GenerationController;
use studio_remote::RemoteCallSimulator;
use studio_store::{HistoryStore, StorageMedium};

use crate::config::ServerConfig;

/// The controller served by the API.
pub type StudioController = GenerationController<RemoteCallSimulator>;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub controller: Arc<StudioController>,
    pub history: Arc<HistoryStore>,
    /// Lifecycle events forwarded to WebSocket clients.
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// Wire the history store, event bus and controller around `simulator`.
    pub fn new(
        config: ServerConfig,
        medium: Arc<dyn StorageMedium>,
        channel: Arc<dyn ChangeChannel>,
        simulator: RemoteCallSimulator,
    ) -> Self {
        let history = Arc::new(HistoryStore::open(medium, channel));
        let event_bus = Arc::new(EventBus::default());
        let controller = Arc::new(GenerationController::new(
            Arc::new(simulator),
            Arc::clone(&history),
            Arc::clone(&event_bus),
            config.retry_policy(),
        ));

        Self {
            config: Arc::new(config),
            controller,
            history,
            event_bus,
        }
    }
}
