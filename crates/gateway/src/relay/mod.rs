//! The inbox relay: live fan-out of team chat messages.
//!
//! Messages are durable before they ever reach this module — the REST layer
//! persists a chat entry and hands the stored copy back to the client, which
//! then submits it over its WebSocket for delivery to the rest of the team.
//! The relay keeps no state beyond the registry of live connections, so a
//! reconnecting client recovers anything it missed with a history fetch.

pub mod broadcast;
pub mod registry;
pub mod session;

pub use broadcast::Broadcaster;
pub use registry::{ConnectionId, RelayRegistry};
pub use session::inbox_websocket_handler;

use axum::{routing::get, Router};

use crate::state::GatewayState;

/// Create the WebSocket route for the inbox relay
pub fn create_relay_routes() -> Router<GatewayState> {
    Router::new().route("/ws", get(inbox_websocket_handler))
}
