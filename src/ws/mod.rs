//! WebSocket layer: upgrade handling, wire messages and the per-connection
//! state machine.
//!
//! Upgrades under the reserved path prefix (`/ws` by default) open a hub
//! connection; clients then subscribe to topics and receive published
//! events.

pub mod connection;
pub mod handler;
pub mod messages;
