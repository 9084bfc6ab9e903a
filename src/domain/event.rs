//! Event envelope carried from producers to subscribers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A named event with an opaque JSON payload.
///
/// The hub never inspects `payload`; its shape is a contract between the
/// producer and the subscribers of a topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EventEnvelope {
    /// Event type, e.g. `"order.created"`.
    pub name: String,
    /// Producer-defined payload.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Creates a new envelope.
    #[must_use]
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}
