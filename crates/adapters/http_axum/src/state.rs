//! Shared application state for axum handlers.

use std::sync::Arc;

use glowhub_app::hub::BroadcastHub;
use glowhub_app::registry::DeviceRegistry;
use glowhub_app::services::group_service::GroupService;

/// Application state shared across all axum handlers.
///
/// Every field is a cheap handle, so cloning per request is fine.
#[derive(Clone)]
pub struct AppState {
    /// Live device registry.
    pub registry: DeviceRegistry,
    /// Group use-cases.
    pub group_service: Arc<GroupService>,
    /// Fan-out hub for WebSocket subscribers.
    pub hub: BroadcastHub,
}

impl AppState {
    /// Create a new application state.
    pub fn new(registry: DeviceRegistry, group_service: GroupService, hub: BroadcastHub) -> Self {
        Self {
            registry,
            group_service: Arc::new(group_service),
            hub,
        }
    }
}
