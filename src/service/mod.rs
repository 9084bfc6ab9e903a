//! Service layer: the realtime hub.
//!
//! [`Hub`] owns the live connections and the subscription index, and is
//! the single entry point for subscribe, unsubscribe, cleanup and publish.

pub mod hub;

pub use hub::{ConnectionState, HeartbeatHandle, Hub, HubStats, Outbound, Registration};
