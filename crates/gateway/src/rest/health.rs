//! Health check endpoint

use axum::{routing::get, Json, Router};
use serde_json::json;

use crate::state::GatewayState;

pub fn routes() -> Router<GatewayState> {
    Router::new().route("/health", get(health_check))
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
