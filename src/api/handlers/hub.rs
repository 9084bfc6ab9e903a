//! Hub endpoints: publish, topic listing, stats.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{PublishRequest, PublishResponse, StatsResponse, TopicSummaryDto};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, HubError};

/// `POST /publish` — Publish an event to a topic.
///
/// # Errors
///
/// Returns [`HubError::InvalidTopic`] if the topic fails validation and
/// [`HubError::InvalidRequest`] if the event name is empty.
#[utoipa::path(
    post,
    path = "/api/v1/publish",
    tag = "Hub",
    summary = "Publish an event",
    description = "Fans the event out to every connection currently subscribed to the topic. Publishing to a topic without subscribers succeeds with `delivered = 0`.",
    request_body = PublishRequest,
    responses(
        (status = 200, description = "Event published", body = PublishResponse),
        (status = 400, description = "Invalid topic or event", body = ErrorResponse),
    )
)]
pub async fn publish(
    State(state): State<AppState>,
    Json(req): Json<PublishRequest>,
) -> Result<impl IntoResponse, HubError> {
    if req.event.name.trim().is_empty() {
        return Err(HubError::InvalidRequest(
            "event name must not be empty".to_string(),
        ));
    }
    let delivered = state.hub.publish_raw(&req.topic, req.event).await?;
    Ok(Json(PublishResponse {
        topic: req.topic,
        delivered,
    }))
}

/// `GET /topics` — List topics with subscribers.
#[utoipa::path(
    get,
    path = "/api/v1/topics",
    tag = "Hub",
    summary = "List active topics",
    description = "Returns every topic that currently has at least one subscriber, sorted by name.",
    responses(
        (status = 200, description = "Active topics", body = Vec<TopicSummaryDto>),
    )
)]
pub async fn list_topics(State(state): State<AppState>) -> impl IntoResponse {
    let topics: Vec<TopicSummaryDto> = state
        .hub
        .topics()
        .await
        .into_iter()
        .map(TopicSummaryDto::from)
        .collect();
    Json(topics)
}

/// `GET /stats` — Connection and subscription counters.
#[utoipa::path(
    get,
    path = "/api/v1/stats",
    tag = "Hub",
    summary = "Hub statistics",
    description = "Returns the number of registered connections, active topics and subscriptions.",
    responses(
        (status = 200, description = "Current counters", body = StatsResponse),
    )
)]
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatsResponse::from(state.hub.stats().await))
}

/// Hub routes, nested under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/publish", post(publish))
        .route("/topics", get(list_topics))
        .route("/stats", get(stats))
}
