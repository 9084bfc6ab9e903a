//! Axum WebSocket upgrade handler.
//!
//! Mounted as the router fallback, so every request that no REST route
//! claims ends up here. Only upgrade requests under the reserved path
//! prefix are handed to the hub; everything else is refused before any
//! WebSocket handshake takes place.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};

use super::connection::run_connection;
use crate::app_state::AppState;

/// Returns `true` if `path` designates the hub's reserved upgrade prefix.
#[must_use]
pub fn is_hub_path(path: &str, prefix: &str) -> bool {
    path.starts_with(prefix)
}

/// `GET /ws…` — Upgrade HTTP connection to WebSocket.
pub async fn ws_handler(
    State(state): State<AppState>,
    uri: Uri,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let on_hub_path = is_hub_path(uri.path(), &state.config.ws_path);

    let ws = match upgrade {
        Ok(ws) if on_hub_path => ws,
        Ok(_) => {
            tracing::debug!(path = %uri.path(), "refusing upgrade outside hub path");
            return refuse();
        }
        // Plain HTTP on the hub path: let axum explain what is missing.
        Err(rejection) if on_hub_path => return rejection.into_response(),
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };

    let hub = state.hub.clone();
    let registration = hub.connect().await;
    let id = registration.id;
    let failed_hub = hub.clone();

    ws.on_failed_upgrade(move |err| {
        tracing::warn!(connection_id = %id, error = %err, "ws handshake failed");
        tokio::spawn(async move {
            failed_hub.cleanup(id).await;
        });
    })
    .on_upgrade(move |socket| run_connection(socket, hub, registration))
}

/// Response for upgrades outside the hub path: no handshake, and the
/// transport is closed once the response is written.
fn refuse() -> Response {
    (StatusCode::NOT_FOUND, [(header::CONNECTION, "close")]).into_response()
}
