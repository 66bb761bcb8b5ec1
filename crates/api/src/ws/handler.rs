use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use crate::state::AppState;
use crate::ws::message::WsMessage;

/// Interval between heartbeat pings.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// HTTP handler that upgrades the connection to WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Manage a single WebSocket connection after upgrade.
///
/// A spawned sender task pushes status snapshots, bus events and
/// heartbeat pings; the current task drains inbound frames until the
/// client goes away.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let (sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        if let Err(e) = forward(sink, &state).await {
            tracing::debug!(conn_id = %sender_conn_id, error = %e, "WebSocket sink closed");
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}

async fn forward(
    mut sink: SplitSink<WebSocket, Message>,
    state: &AppState,
) -> Result<(), axum::Error> {
    let mut status_rx = state.controller.subscribe_status();
    let mut events_rx = state.event_bus.subscribe();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    let initial = WsMessage::Status(status_rx.borrow_and_update().clone());
    send(&mut sink, &initial).await?;

    loop {
        tokio::select! {
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = status_rx.borrow_and_update().clone();
                send(&mut sink, &WsMessage::Status(status)).await?;
            }
            event = events_rx.recv() => match event {
                Ok(event) => send(&mut sink, &WsMessage::Event(event)).await?,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "WebSocket client lagging behind event bus");
                }
                Err(RecvError::Closed) => break,
            },
            _ = heartbeat.tick() => {
                sink.send(Message::Ping(Default::default())).await?;
            }
        }
    }

    Ok(())
}

async fn send(
    sink: &mut SplitSink<WebSocket, Message>,
    message: &WsMessage,
) -> Result<(), axum::Error> {
    match message.to_json() {
        Some(json) => sink.send(Message::Text(json.into())).await,
        None => Ok(()),
    }
}
