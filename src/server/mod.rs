//! Server-side modules for the triplog room server.

pub mod storage;
pub mod sync;

use std::sync::Arc;

use axum::{
    extract::{State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

pub use storage::{ServerStorage, ServerStorageError};
pub use sync::{handle_socket, RoomHub};

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Upgrades to the room WebSocket protocol
async fn rooms(ws: WebSocketUpgrade, State(hub): State<Arc<RoomHub>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// Builds the server router.
pub fn router(hub: Arc<RoomHub>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/rooms", get(rooms))
        .with_state(hub)
        .layer(TraceLayer::new_for_http())
}
