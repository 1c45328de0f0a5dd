//! JSON API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod devices;
pub mod events;
#[allow(clippy::missing_errors_doc)]
pub mod groups;

use axum::Router;
use axum::routing::{get, put};

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Devices
        .route("/devices", get(devices::list))
        .route("/devices/{id}", get(devices::get).delete(devices::delete))
        .route(
            "/devices/{id}/properties/{property}",
            put(devices::set_property),
        )
        // Groups
        .route("/groups", get(groups::list).post(groups::create))
        .route("/groups/{id}", get(groups::get).delete(groups::delete))
        .route(
            "/groups/{id}/members/{device_id}",
            put(groups::add_member).delete(groups::remove_member),
        )
        .route(
            "/groups/{id}/properties/{property}",
            put(groups::set_property),
        )
        // Events
        .route("/events/ws", get(events::subscribe))
}
