//! WebSocket handler
//!
//! Bridges an upgraded axum WebSocket to a `ConnectionHandler`: inbound frames
//! become `InboundEvent`s, and a writer task drains the connection's outbound
//! queue into the socket.

use super::session::{ConnectionHandler, DisconnectReason, InboundEvent};
use crate::protocol::Frame;
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{Sink, SinkExt, StreamExt};
use relay_common::RelayConfig;
use relay_core::SessionId;
use std::time::Duration;
use tokio::sync::mpsc;

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let relay = state.relay().clone();
    let capacity = relay.outbound_buffer.max(RelayConfig::MIN_OUTBOUND_BUFFER);
    let (tx, rx) = mpsc::channel::<Frame>(capacity);

    let (ws_sink, ws_stream) = socket.split();

    let handler = ConnectionHandler::open(state, tx);
    let session_id = handler.session_id().clone();

    let mut writer = tokio::spawn(write_frames(
        ws_sink,
        rx,
        relay.send_timeout(),
        session_id.clone(),
    ));

    let inbound_id = session_id.clone();
    let inbound = ws_stream.map(move |msg| inbound_event(&inbound_id, msg));

    let reason = handler.run(inbound).await;

    if reason == DisconnectReason::SlowConsumer {
        writer.abort();
    } else if tokio::time::timeout(relay.send_timeout(), &mut writer)
        .await
        .is_err()
    {
        tracing::debug!(session_id = %session_id, "Writer did not drain in time");
        writer.abort();
    }

    tracing::debug!(session_id = %session_id, reason = %reason, "WebSocket closed");
}

fn inbound_event(session_id: &SessionId, msg: Result<Message, axum::Error>) -> InboundEvent {
    match msg {
        Ok(Message::Text(text)) => InboundEvent::Text(text),
        Ok(Message::Binary(data)) => InboundEvent::Binary(data.len()),
        // Pong replies are sent by the transport
        Ok(Message::Ping(_) | Message::Pong(_)) => InboundEvent::Heartbeat,
        Ok(Message::Close(_)) => {
            tracing::debug!(session_id = %session_id, "Client sent close frame");
            InboundEvent::Closed
        }
        Err(e) => {
            tracing::debug!(session_id = %session_id, error = %e, "WebSocket read error");
            InboundEvent::Closed
        }
    }
}

/// Drain the outbound queue into the socket
///
/// Returns when the queue closes or a write fails or exceeds `send_timeout`.
/// Dropping the receiver on exit is what tells the handler the writer is gone.
async fn write_frames<S>(
    mut sink: S,
    mut rx: mpsc::Receiver<Frame>,
    send_timeout: Duration,
    session_id: SessionId,
) where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(frame) = rx.recv().await {
        match tokio::time::timeout(send_timeout, sink.send(Message::Text(frame.to_string()))).await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(session_id = %session_id, error = %e, "Socket write failed");
                break;
            }
            Err(_) => {
                tracing::warn!(
                    session_id = %session_id,
                    timeout_ms = send_timeout.as_millis() as u64,
                    "Socket write timed out"
                );
                break;
            }
        }
    }

    drop(rx);
    match tokio::time::timeout(send_timeout, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::debug!(session_id = %session_id, error = %e, "Socket close failed");
        }
        Err(_) => {
            tracing::debug!(session_id = %session_id, "Socket close timed out");
        }
    }
}
