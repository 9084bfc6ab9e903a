//! Publish, topic listing and stats DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{EventEnvelope, Topic};
use crate::service::HubStats;

/// Request body for `POST /publish`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PublishRequest {
    /// Target topic, e.g. `"order:123"`.
    pub topic: String,
    /// Event forwarded verbatim to subscribers.
    pub event: EventEnvelope,
}

/// Response body for `POST /publish`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PublishResponse {
    /// Topic the event was published on.
    pub topic: String,
    /// Number of connections the event was queued for.
    pub delivered: usize,
}

/// One entry of `GET /topics`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TopicSummaryDto {
    /// Topic name.
    pub topic: String,
    /// Current subscriber count (always at least 1).
    pub subscribers: usize,
}

impl From<(Topic, usize)> for TopicSummaryDto {
    fn from((topic, subscribers): (Topic, usize)) -> Self {
        Self {
            topic: topic.to_string(),
            subscribers,
        }
    }
}

/// Response body for `GET /stats`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Registered connections.
    pub connections: usize,
    /// Topics with at least one subscriber.
    pub topics: usize,
    /// Total topic subscriptions across all connections.
    pub subscriptions: usize,
}

impl From<HubStats> for StatsResponse {
    fn from(stats: HubStats) -> Self {
        Self {
            connections: stats.connections,
            topics: stats.topics,
            subscriptions: stats.subscriptions,
        }
    }
}
