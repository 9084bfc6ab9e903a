//! WebSocket wire types: inbound commands, outbound frames and frame errors.
//!
//! Every frame in both directions is a single JSON object carried in one
//! text frame. Inbound frames are decoded step by step so that each failure
//! point maps to a distinct [`FrameError`].

use serde::Serialize;
use serde_json::Value;

use crate::domain::{EventEnvelope, Topic};

/// Commands a client can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// `{"type":"ping"}`: application-level liveness probe.
    Ping,
    /// `{"type":"subscribe","topic":"..."}`.
    Subscribe(Topic),
    /// `{"type":"unsubscribe","topic":"..."}`.
    Unsubscribe(Topic),
}

/// Why an inbound frame was refused.
///
/// The `Display` output is the exact `message` sent back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The frame is not valid JSON (or not valid UTF-8).
    #[error("Invalid JSON")]
    InvalidJson,
    /// The frame is JSON but not an object with a string `type`.
    #[error("Invalid message")]
    InvalidMessage,
    /// The `type` field names no known command.
    #[error("Unknown message type")]
    UnknownMessageType,
    /// `topic` is missing, not a string, or fails topic validation.
    #[error("Invalid topic")]
    InvalidTopic,
}

impl ClientMessage {
    /// Decodes one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns the [`FrameError`] matching the first check the frame fails.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text).map_err(|_| FrameError::InvalidJson)?;
        let Value::Object(fields) = value else {
            return Err(FrameError::InvalidMessage);
        };
        let Some(msg_type) = fields.get("type").and_then(Value::as_str) else {
            return Err(FrameError::InvalidMessage);
        };

        match msg_type {
            "ping" => Ok(Self::Ping),
            "subscribe" => topic_field(&fields).map(Self::Subscribe),
            "unsubscribe" => topic_field(&fields).map(Self::Unsubscribe),
            _ => Err(FrameError::UnknownMessageType),
        }
    }

    /// Decodes a binary frame as UTF-8 JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InvalidJson`] for non-UTF-8 payloads, otherwise
    /// behaves like [`ClientMessage::parse`].
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let text = std::str::from_utf8(bytes).map_err(|_| FrameError::InvalidJson)?;
        Self::parse(text)
    }
}

fn topic_field(fields: &serde_json::Map<String, Value>) -> Result<Topic, FrameError> {
    fields
        .get("topic")
        .and_then(Value::as_str)
        .and_then(|raw| Topic::parse(raw).ok())
        .ok_or(FrameError::InvalidTopic)
}

/// Frames the hub sends to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent on open and in reply to `ping`.
    Ready,
    /// Subscription acknowledged.
    Subscribed {
        /// Topic the connection is now subscribed to.
        topic: Topic,
    },
    /// Unsubscription acknowledged.
    Unsubscribed {
        /// Topic the connection left.
        topic: Topic,
    },
    /// A published event.
    Event {
        /// Topic the event was published on.
        topic: Topic,
        /// The producer's envelope, forwarded untouched.
        event: EventEnvelope,
    },
    /// A refused inbound frame.
    Error {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerMessage {
    /// Serializes the frame to its JSON text form.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<FrameError> for ServerMessage {
    fn from(err: FrameError) -> Self {
        Self::Error {
            message: err.to_string(),
        }
    }
}
