//! Best-effort delivery channel to already-connected clients.
//!
//! The channel is an explicit injected dependency, never a process-wide
//! singleton: deployments without a realtime surface simply pass `None` and
//! every send is a safe no-op. Failures are caught and logged here — they
//! never propagate and never affect the outcome of the operation that
//! triggered the fan-out.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use opsdesk_core::types::DbId;

/// Error type for channel implementations.
pub type ChannelError = Box<dyn std::error::Error + Send + Sync>;

/// A side-channel event pushed to a user's connected clients.
#[derive(Debug, Clone, Serialize)]
pub struct ClientEvent {
    /// Dot-separated event name, e.g. `"notification.read"`.
    pub name: String,
    /// Event-specific JSON payload.
    pub payload: serde_json::Value,
}

impl ClientEvent {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Push surface for realtime client updates.
///
/// Implementations deliver to whatever transport they manage (the API crate
/// provides a WebSocket-backed one). Delivery is best effort by contract;
/// callers go through [`send_best_effort`] rather than invoking this
/// directly from business operations.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send_to_user(&self, user_id: DbId, event: &ClientEvent) -> Result<(), ChannelError>;
}

/// Fire-and-forget send: a missing channel is a no-op, a failing one is
/// logged and swallowed.
pub async fn send_best_effort(
    channel: Option<&Arc<dyn DeliveryChannel>>,
    user_id: DbId,
    event: &ClientEvent,
) {
    let Some(channel) = channel else {
        return;
    };
    if let Err(e) = channel.send_to_user(user_id, event).await {
        tracing::warn!(
            error = %e,
            user_id,
            event = %event.name,
            "Client event delivery failed"
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records sends; fails when told to.
    struct RecordingChannel {
        sent: Mutex<Vec<(DbId, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl DeliveryChannel for RecordingChannel {
        async fn send_to_user(
            &self,
            user_id: DbId,
            event: &ClientEvent,
        ) -> Result<(), ChannelError> {
            if self.fail {
                return Err("transport down".into());
            }
            self.sent.lock().unwrap().push((user_id, event.name.clone()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn absent_channel_is_a_noop() {
        let event = ClientEvent::new("notification.read", serde_json::json!({}));
        send_best_effort(None, 1, &event).await;
    }

    #[tokio::test]
    async fn events_reach_the_channel() {
        let recording = Arc::new(RecordingChannel {
            sent: Mutex::new(Vec::new()),
            fail: false,
        });
        let channel: Arc<dyn DeliveryChannel> = recording.clone();
        let event = ClientEvent::new("notification.deleted", serde_json::json!({"id": 3}));
        send_best_effort(Some(&channel), 5, &event).await;
        assert_eq!(
            recording.sent.lock().unwrap().as_slice(),
            &[(5, "notification.deleted".to_string())]
        );
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let channel: Arc<dyn DeliveryChannel> = Arc::new(RecordingChannel {
            sent: Mutex::new(Vec::new()),
            fail: true,
        });
        let event = ClientEvent::new("notification.read", serde_json::json!({}));
        // Must not panic or propagate.
        send_best_effort(Some(&channel), 1, &event).await;
    }
}
