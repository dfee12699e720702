//! Opsdesk event bus and delivery-channel infrastructure.
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`; business events published here drive
//!   notification creation.
//! - [`PlatformEvent`] — the canonical domain event envelope.
//! - [`DeliveryChannel`] — best-effort push to an already-connected client,
//!   with [`channel::send_best_effort`] enforcing the fire-and-forget
//!   contract.

pub mod bus;
pub mod channel;

pub use bus::{EventBus, PlatformEvent};
pub use channel::{ClientEvent, DeliveryChannel};
