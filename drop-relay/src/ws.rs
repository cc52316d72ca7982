//! WebSocket transport adapter.
//!
//! Bridges axum WebSocket connections onto the session state machine: one
//! receive loop per connection plus a spawned forwarder draining the
//! connection's outbound channel. The core never touches the socket
//! directly; it only sees a [`ConnectionHandle`].

use crate::registry::ConnectionHandle;
use crate::server::Relay;
use crate::session::Session;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::Extension;
use drop_types::ConnectionId;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Upgrade handler for `GET /ws`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(relay): Extension<Arc<Relay>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_connection(relay, socket))
}

/// Drive one WebSocket connection until it closes.
async fn run_connection(relay: Arc<Relay>, socket: WebSocket) {
    let connection_id = ConnectionId::new();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (outbound_tx, mut outbound_rx) =
        mpsc::channel(relay.config().limits.outbound_buffer.max(1));
    let handle = ConnectionHandle::new(connection_id, outbound_tx);

    relay
        .metrics()
        .connections_total
        .fetch_add(1, Ordering::Relaxed);
    tracing::info!(connection = %connection_id, "connection open");

    // Outbound forwarder: serializes queued messages onto the socket.
    let forwarder = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            let json = match message.to_json() {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!("failed to serialize outbound message: {}", e);
                    continue;
                }
            };
            if ws_tx.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let mut session = Session::new(relay, handle);

    while let Some(Ok(frame)) = ws_rx.next().await {
        match frame {
            Message::Text(text) => session.handle_text(&text).await,
            Message::Close(_) => break,
            Message::Binary(data) => {
                tracing::debug!(
                    connection = %connection_id,
                    len = data.len(),
                    "ignoring binary frame"
                );
            }
            // axum answers pings automatically.
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    session.close();
    forwarder.abort();
    tracing::info!(connection = %connection_id, "connection closed");
}
