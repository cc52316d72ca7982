//! HTTP surface for passdrop-relay.
//!
//! Provides passcode minting/validation, transfer status, health, metrics,
//! and the WebSocket upgrade route.

mod connections;
pub mod health;
mod metrics;
mod transfers;

use crate::server::Relay;
use crate::ws;
use axum::{
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;

pub use health::HealthStatus;

/// Build the HTTP router with all endpoints.
pub fn build_router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route(
            "/connections/generate-passcode",
            post(connections::generate_passcode_handler),
        )
        .route(
            "/connections/connect/:passcode",
            post(connections::connect_handler),
        )
        .route("/transfers/:transfer_id", get(transfers::transfer_handler))
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(Extension(relay))
}
