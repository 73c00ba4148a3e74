//! WebSocket stream of lab events

use crate::app_state::AppState;
use crate::events::EventBus;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// GET /events
async fn events_ws(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let bus = state.bus().clone();
    ws.on_upgrade(move |socket| handle_socket(socket, bus))
}

async fn handle_socket(socket: WebSocket, bus: EventBus) {
    tracing::info!(subscribers = bus.subscriber_count() + 1, "event stream connected");

    let (mut sender, mut receiver) = socket.split();
    let mut rx = bus.subscribe();

    let mut send_task = tokio::spawn(async move {
        loop {
            let envelope = match rx.recv().await {
                Ok(envelope) => envelope,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event stream lagging");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let json = match serde_json::to_string(&envelope) {
                Ok(j) => j,
                Err(e) => {
                    tracing::error!("failed to serialize event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // Client messages are ignored; only close ends the stream
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    tracing::info!("event stream disconnected");
}

pub fn events_router(state: Arc<AppState>) -> Router {
    Router::new().route("/events", get(events_ws)).with_state(state)
}
