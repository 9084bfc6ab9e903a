//! Domain layer: topic names, connection identity, event envelopes and the
//! subscription index.
//!
//! Everything in here is plain in-memory data with no I/O; the
//! [`crate::service::Hub`] wraps it with synchronization and delivery.

pub mod connection_id;
pub mod event;
pub mod subscription_index;
pub mod topic;

pub use connection_id::ConnectionId;
pub use event::EventEnvelope;
pub use subscription_index::SubscriptionIndex;
pub use topic::{Topic, TopicError, TopicNamespace};
