//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::HubConfig;
use crate::service::Hub;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The realtime hub.
    pub hub: Hub,
    /// Runtime configuration (upgrade path prefix, limits).
    pub config: Arc<HubConfig>,
}

impl AppState {
    /// Bundles a hub with its configuration.
    #[must_use]
    pub fn new(hub: Hub, config: HubConfig) -> Self {
        Self {
            hub,
            config: Arc::new(config),
        }
    }
}
