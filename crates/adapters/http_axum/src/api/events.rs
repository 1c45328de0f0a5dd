//! Live event feed over WebSocket.

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::response::{IntoResponse, Response};

use glowhub_domain::error::GlowHubError;

use crate::error::ApiError;
use crate::state::AppState;
use crate::transport::WsTransport;

/// `GET /api/events/ws`: upgrade to a WebSocket and admit it to the hub.
///
/// The socket then receives every bus event as a JSON text frame. The hub
/// pings it periodically and drops it when pongs stop arriving or when it
/// cannot keep up.
pub async fn subscribe(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    if state.hub.is_shut_down() {
        return ApiError::from(GlowHubError::ShutDown).into_response();
    }

    ws.on_upgrade(move |socket| async move {
        match state.hub.admit(WsTransport::new(socket)).await {
            Ok(subscriber_id) => {
                tracing::debug!(%subscriber_id, "websocket subscriber admitted");
            }
            Err(err) => tracing::warn!(error = %err, "websocket subscriber rejected"),
        }
    })
}
