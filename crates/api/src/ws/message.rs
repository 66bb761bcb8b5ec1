use serde::Serialize;
use studio_events::StudioEvent;
use studio_pipeline::GenerationStatus;

/// Outbound WebSocket frame, serialized as `{ "type": ..., "data": ... }`.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WsMessage {
    Status(GenerationStatus),
    Event(StudioEvent),
}

impl WsMessage {
    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize WebSocket message");
                None
            }
        }
    }
}
