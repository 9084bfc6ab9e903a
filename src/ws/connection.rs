//! WebSocket connection state machine.
//!
//! Drives one connection through `Connecting → Open → Closed`: opens it in
//! the hub (which queues `ready`), then runs a single loop that dispatches
//! inbound frames in arrival order and writes whatever the hub queued for
//! the connection. Any exit from the loop runs the hub's cleanup.

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};

use super::messages::{ClientMessage, FrameError, ServerMessage};
use crate::domain::{ConnectionId, Topic};
use crate::service::{Hub, Outbound, Registration};

/// Runs the read/write loop for a single, already registered connection.
///
/// - Reads frames from the client and answers each one directly.
/// - Forwards events, pings and close requests queued by the [`Hub`].
pub async fn run_connection(socket: WebSocket, hub: Hub, registration: Registration) {
    let Registration { id, mut outbound } = registration;
    if !hub.open(id).await {
        hub.cleanup(id).await;
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            biased;

            // Frames queued by the hub (ready, events, pings, close)
            queued = outbound.recv() => {
                let message = match queued {
                    Some(Outbound::Frame(text)) => Message::Text(text),
                    Some(Outbound::Ping) => Message::Ping(Bytes::new()),
                    Some(Outbound::Close) | None => {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                };
                if ws_tx.send(message).await.is_err() {
                    break;
                }
            }
            // Incoming frame from the client
            msg = ws_rx.next() => {
                let reply = match msg {
                    Some(Ok(Message::Text(text))) => {
                        Some(handle_text_message(&hub, id, text.as_str()).await)
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        Some(dispatch(&hub, id, ClientMessage::parse_bytes(&bytes)).await)
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => None,
                    Some(Err(err)) => {
                        tracing::debug!(connection_id = %id, error = %err, "ws transport error");
                        break;
                    }
                };
                if let Some(reply) = reply
                    && send_frame(&mut ws_tx, &reply).await.is_err()
                {
                    break;
                }
            }
        }
    }

    hub.cleanup(id).await;
}

/// Decodes and dispatches one text frame, returning the reply to send.
pub async fn handle_text_message(hub: &Hub, id: ConnectionId, text: &str) -> ServerMessage {
    dispatch(hub, id, ClientMessage::parse(text)).await
}

async fn dispatch(
    hub: &Hub,
    id: ConnectionId,
    parsed: Result<ClientMessage, FrameError>,
) -> ServerMessage {
    match parsed {
        Ok(ClientMessage::Ping) => on_ping(),
        Ok(ClientMessage::Subscribe(topic)) => on_subscribe(hub, id, topic).await,
        Ok(ClientMessage::Unsubscribe(topic)) => on_unsubscribe(hub, id, topic).await,
        Err(err) => {
            tracing::debug!(connection_id = %id, error = %err, "rejected frame");
            ServerMessage::from(err)
        }
    }
}

fn on_ping() -> ServerMessage {
    ServerMessage::Ready
}

async fn on_subscribe(hub: &Hub, id: ConnectionId, topic: Topic) -> ServerMessage {
    hub.subscribe(id, &topic).await;
    ServerMessage::Subscribed { topic }
}

async fn on_unsubscribe(hub: &Hub, id: ConnectionId, topic: Topic) -> ServerMessage {
    hub.unsubscribe(id, &topic).await;
    ServerMessage::Unsubscribed { topic }
}

async fn send_frame(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    frame: &ServerMessage,
) -> Result<(), axum::Error> {
    match frame.to_json() {
        Ok(json) => ws_tx.send(Message::text(json)).await,
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize reply");
            Ok(())
        }
    }
}
