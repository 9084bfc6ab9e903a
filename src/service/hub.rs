//! Realtime hub: connection registry, subscriptions and event fan-out.
//!
//! [`Hub`] owns every live connection's outbound queue together with the
//! [`SubscriptionIndex`]. Both sit behind one [`tokio::sync::Mutex`] so that
//! register, subscribe, unsubscribe, cleanup, publish and heartbeat each run
//! as a single critical section. No critical section awaits I/O: outbound
//! frames are handed to per-connection queues with `try_send` and written to
//! the socket by the connection's own task.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Utf8Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::domain::{ConnectionId, EventEnvelope, SubscriptionIndex, Topic};
use crate::error::HubError;
use crate::ws::messages::ServerMessage;

/// Default capacity of each connection's outbound queue.
pub const DEFAULT_CONNECTION_BUFFER: usize = 256;

/// Lifecycle state of a connection as seen by the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Upgrade accepted, handshake not yet completed.
    Connecting,
    /// Handshake completed; frames flow in both directions.
    Open,
    /// Closed or unknown. Terminal.
    Closed,
}

/// Work item for a connection's writer.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// A serialized JSON frame.
    Frame(Utf8Bytes),
    /// A protocol-level ping.
    Ping,
    /// Close the socket.
    Close,
}

/// Returned by [`Hub::connect`]: the new identity and its outbound queue.
#[derive(Debug)]
pub struct Registration {
    /// Identity of the new connection.
    pub id: ConnectionId,
    /// Frames the hub wants written to this connection.
    pub outbound: mpsc::Receiver<Outbound>,
}

/// Point-in-time hub counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubStats {
    /// Registered connections (connecting or open).
    pub connections: usize,
    /// Topics with at least one subscriber.
    pub topics: usize,
    /// Total (topic, connection) pairs.
    pub subscriptions: usize,
}

#[derive(Debug)]
struct ConnectionHandle {
    sender: mpsc::Sender<Outbound>,
    state: ConnectionState,
    connected_at: DateTime<Utc>,
}

impl ConnectionHandle {
    fn is_open(&self) -> bool {
        self.state == ConnectionState::Open && !self.sender.is_closed()
    }
}

#[derive(Debug, Default)]
struct HubState {
    connections: HashMap<ConnectionId, ConnectionHandle>,
    index: SubscriptionIndex,
}

/// Cheaply clonable handle to one hub instance.
///
/// Clones share the same registry; separate [`Hub::new`] calls are fully
/// independent, which keeps tests isolated.
#[derive(Debug, Clone)]
pub struct Hub {
    state: Arc<Mutex<HubState>>,
    connection_buffer: usize,
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_BUFFER)
    }
}

impl Hub {
    /// Creates an empty hub whose per-connection queues hold
    /// `connection_buffer` frames (at least one).
    #[must_use]
    pub fn new(connection_buffer: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::default())),
            connection_buffer: connection_buffer.max(1),
        }
    }

    /// Registers a new connection in the `Connecting` state.
    pub async fn connect(&self) -> Registration {
        let (sender, outbound) = mpsc::channel(self.connection_buffer);
        let id = ConnectionId::new();
        let handle = ConnectionHandle {
            sender,
            state: ConnectionState::Connecting,
            connected_at: Utc::now(),
        };
        self.state.lock().await.connections.insert(id, handle);
        tracing::debug!(connection_id = %id, "connection registered");
        Registration { id, outbound }
    }

    /// Moves a connection to `Open` and queues the initial `ready` frame.
    ///
    /// Returns `false` if the connection is unknown or already closed.
    pub async fn open(&self, id: ConnectionId) -> bool {
        let Some(ready) = encode(&ServerMessage::Ready) else {
            return false;
        };
        let mut state = self.state.lock().await;
        let Some(handle) = state.connections.get_mut(&id) else {
            return false;
        };
        if handle.state != ConnectionState::Connecting {
            return false;
        }
        handle.state = ConnectionState::Open;
        if handle.sender.try_send(Outbound::Frame(ready)).is_err() {
            tracing::warn!(connection_id = %id, "could not queue ready frame");
        }
        tracing::info!(connection_id = %id, "connection open");
        true
    }

    /// Subscribes a registered connection to `topic`.
    ///
    /// Returns `true` if the subscription is new. Unknown connections are
    /// ignored so that a late frame cannot resurrect a cleaned-up entry.
    pub async fn subscribe(&self, id: ConnectionId, topic: &Topic) -> bool {
        let mut state = self.state.lock().await;
        if !state.connections.contains_key(&id) {
            return false;
        }
        let added = state.index.subscribe(id, topic);
        tracing::debug!(connection_id = %id, topic = %topic, added, "subscribe");
        added
    }

    /// Removes `id` from `topic`'s subscribers.
    ///
    /// Returns `true` if a subscription was removed.
    pub async fn unsubscribe(&self, id: ConnectionId, topic: &Topic) -> bool {
        let removed = self.state.lock().await.index.unsubscribe(id, topic);
        tracing::debug!(connection_id = %id, topic = %topic, removed, "unsubscribe");
        removed
    }

    /// Drops every trace of a connection: its subscriptions and its handle.
    ///
    /// Safe to call more than once; later calls find nothing and return 0.
    /// Returns the number of subscriptions released.
    pub async fn cleanup(&self, id: ConnectionId) -> usize {
        let mut state = self.state.lock().await;
        let released = state.index.remove_connection(id);
        let Some(handle) = state.connections.remove(&id) else {
            return released.len();
        };
        drop(state);

        let lifetime = Utc::now() - handle.connected_at;
        tracing::info!(
            connection_id = %id,
            subscriptions = released.len(),
            lifetime_ms = lifetime.num_milliseconds(),
            "connection closed"
        );
        released.len()
    }

    /// Sends `event` to every open subscriber of `topic`.
    ///
    /// Publishing to a topic with no subscribers is a silent no-op.
    /// Connections that are not open, or whose queue is full, are skipped.
    /// Returns the number of connections the frame was queued for.
    pub async fn publish(&self, topic: &Topic, event: EventEnvelope) -> usize {
        let frame = ServerMessage::Event {
            topic: topic.clone(),
            event,
        };
        let Some(text) = encode(&frame) else {
            return 0;
        };

        let state = self.state.lock().await;
        let Some(subscribers) = state.index.subscribers(topic) else {
            tracing::trace!(topic = %topic, "publish to topic without subscribers");
            return 0;
        };

        let mut delivered = 0;
        for id in subscribers {
            let Some(handle) = state.connections.get(id) else {
                continue;
            };
            if !handle.is_open() {
                continue;
            }
            match handle.sender.try_send(Outbound::Frame(text.clone())) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(connection_id = %id, topic = %topic, "outbound queue full, event dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        tracing::debug!(topic = %topic, delivered, "event published");
        delivered
    }

    /// Validates `topic` and publishes to it.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidTopic`] if `topic` fails validation.
    pub async fn publish_raw(&self, topic: &str, event: EventEnvelope) -> Result<usize, HubError> {
        let topic = Topic::parse(topic)?;
        Ok(self.publish(&topic, event).await)
    }

    /// Queues a protocol-level ping for every open connection.
    ///
    /// Returns the number of connections pinged.
    pub async fn ping_all(&self) -> usize {
        let state = self.state.lock().await;
        let mut pinged = 0;
        for handle in state.connections.values() {
            if handle.is_open() && handle.sender.try_send(Outbound::Ping).is_ok() {
                pinged += 1;
            }
        }
        pinged
    }

    /// Starts the process-wide heartbeat: one timer that pings every open
    /// connection each `period`.
    ///
    /// The timer runs until the returned handle is stopped or dropped.
    #[must_use]
    pub fn spawn_heartbeat(&self, period: Duration) -> HeartbeatHandle {
        let hub = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let pinged = hub.ping_all().await;
                tracing::trace!(pinged, "heartbeat");
            }
        });
        HeartbeatHandle { task }
    }

    /// Asks every connection to close and marks it `Closed`.
    ///
    /// Handles stay registered until each connection task runs
    /// [`Hub::cleanup`]. Returns the number of connections notified.
    pub async fn shutdown(&self) -> usize {
        let mut state = self.state.lock().await;
        let mut notified = 0;
        for handle in state.connections.values_mut() {
            if handle.state == ConnectionState::Closed {
                continue;
            }
            handle.state = ConnectionState::Closed;
            if handle.sender.try_send(Outbound::Close).is_ok() {
                notified += 1;
            }
        }
        tracing::info!(notified, "hub shutting down");
        notified
    }

    /// Returns the state of a connection; unknown ids are `Closed`.
    pub async fn state_of(&self, id: ConnectionId) -> ConnectionState {
        self.state
            .lock()
            .await
            .connections
            .get(&id)
            .map_or(ConnectionState::Closed, |handle| handle.state)
    }

    /// Returns the topics `id` is subscribed to, sorted.
    pub async fn subscriptions_of(&self, id: ConnectionId) -> Vec<Topic> {
        let state = self.state.lock().await;
        let mut topics: Vec<Topic> = state
            .index
            .topics_of(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        topics.sort();
        topics
    }

    /// Returns every topic with its subscriber count, sorted by topic.
    pub async fn topics(&self) -> Vec<(Topic, usize)> {
        let state = self.state.lock().await;
        let mut topics: Vec<(Topic, usize)> = state
            .index
            .topic_counts()
            .map(|(topic, count)| (topic.clone(), count))
            .collect();
        topics.sort();
        topics
    }

    /// Returns current counters.
    pub async fn stats(&self) -> HubStats {
        let state = self.state.lock().await;
        HubStats {
            connections: state.connections.len(),
            topics: state.index.topic_count(),
            subscriptions: state.index.subscription_count(),
        }
    }
}

/// Owns the heartbeat task; dropping it cancels the timer.
#[derive(Debug)]
pub struct HeartbeatHandle {
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    /// Stops the heartbeat.
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn encode(msg: &ServerMessage) -> Option<Utf8Bytes> {
    match msg.to_json() {
        Ok(text) => Some(Utf8Bytes::from(text)),
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize server frame");
            None
        }
    }
}
