//! WebSocket infrastructure for real-time delivery.
//!
//! Provides connection management, heartbeat monitoring, and the HTTP
//! upgrade handler used by Axum routes. [`WsManager`] implements the
//! [`DeliveryChannel`](opsdesk_events::DeliveryChannel) trait so it can be
//! injected into the notification engine as the in-app push surface.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
