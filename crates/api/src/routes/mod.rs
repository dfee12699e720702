pub mod health;
pub mod notification;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                          WebSocket (realtime notification delivery)
///
/// /events                      internal event ingestion (POST)
///
/// /notifications               feed listing and search
/// /notifications/...           single-item, bulk, preference, and export
///                              endpoints (see routes::notification)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // WebSocket endpoint for realtime delivery
        .route("/ws", get(ws::ws_handler))
        // Internal event ingestion (drives notification creation)
        .route("/events", post(handlers::event::publish_event))
        // Notification feed, mutations, preferences, export
        .nest("/notifications", notification::router())
}
