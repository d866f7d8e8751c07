//! # Huddle Gateway Crate
//!
//! This crate provides the HTTP surface of the Huddle backend: the REST
//! endpoints for accounts, teams, tasks and the inbox, plus the WebSocket
//! inbox relay that fans chat messages out to a team's live connections.
//!
//! ## Architecture
//!
//! - **REST**: request/response CRUD endpoints backed by the repositories
//! - **Relay**: registry + broadcaster + per-connection session handler
//! - **State**: shared application state wiring repositories and services
//! - **Middleware**: bearer-token authentication and request logging

pub mod error;
pub mod middleware;
pub mod relay;
pub mod rest;
pub mod state;

// Re-export main types for convenience
pub use error::{GatewayError, GatewayResult};
pub use relay::{Broadcaster, ConnectionId, RelayRegistry};
pub use state::GatewayState;

use axum::{http::Method, middleware as axum_middleware, Router};
use tower_http::cors::{Any, CorsLayer};

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let protected = rest::create_protected_routes().route_layer(
        axum_middleware::from_fn_with_state(state.clone(), middleware::auth_middleware),
    );

    Router::new()
        .merge(rest::create_public_routes())
        .merge(relay::create_relay_routes())
        .merge(protected)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::PATCH,
                ])
                .allow_headers(Any),
        )
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .with_state(state)
}
