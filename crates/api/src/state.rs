use std::sync::Arc;

use opsdesk_events::{DeliveryChannel, EventBus};

use crate::config::ServerConfig;
use crate::notifications::Clock;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: opsdesk_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Optional realtime side channel. `None` disables fan-out entirely.
    pub delivery: Option<Arc<dyn DeliveryChannel>>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: Arc<EventBus>,
    /// Time source for quiet-hours checks; swapped out in tests.
    pub clock: Arc<dyn Clock>,
}
