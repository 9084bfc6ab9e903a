//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{PublishRequest, PublishResponse, StatsResponse, TopicSummaryDto};
use super::handlers::{hub, system};
use crate::domain::EventEnvelope;
use crate::error::{ErrorBody, ErrorResponse};

/// Aggregated OpenAPI spec, served at `/api-docs/openapi.json`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "topic-hub",
        description = "REST companion of the realtime WebSocket topic hub. Clients connect to `/ws` and exchange JSON frames; producers publish through this API."
    ),
    paths(
        system::health_handler,
        hub::publish,
        hub::list_topics,
        hub::stats,
    ),
    components(schemas(
        PublishRequest,
        PublishResponse,
        TopicSummaryDto,
        StatsResponse,
        EventEnvelope,
        ErrorResponse,
        ErrorBody,
        system::HealthResponse,
    )),
    tags(
        (name = "Hub", description = "Publishing and introspection"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;
