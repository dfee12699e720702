//! Event-to-notification routing engine.
//!
//! [`NotificationRouter`] subscribes to the platform event bus and, for each
//! event, creates an in-app notification row for every recipient whose
//! delivery policy admits the event's kind, then pushes the new row to that
//! user's connected clients.

use std::sync::Arc;

use tokio::sync::broadcast;

use opsdesk_core::preference::Channel;
use opsdesk_core::types::DbId;
use opsdesk_db::models::notification::CreateNotification;
use opsdesk_db::repositories::NotificationRepo;
use opsdesk_db::DbPool;
use opsdesk_events::channel::send_best_effort;
use opsdesk_events::{ClientEvent, DeliveryChannel, PlatformEvent};

use crate::notifications::PreferenceResolver;

/// Routes platform events to user notifications.
pub struct NotificationRouter {
    pool: DbPool,
    resolver: PreferenceResolver,
    delivery: Option<Arc<dyn DeliveryChannel>>,
}

impl NotificationRouter {
    pub fn new(
        pool: DbPool,
        resolver: PreferenceResolver,
        delivery: Option<Arc<dyn DeliveryChannel>>,
    ) -> Self {
        Self {
            pool,
            resolver,
            delivery,
        }
    }

    /// Run the main routing loop.
    ///
    /// Subscribes to the event bus via `receiver` and processes each event.
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](opsdesk_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route_event(&event).await {
                        tracing::error!(
                            error = %e,
                            kind = %event.kind,
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Route a single event to all eligible recipients.
    async fn route_event(&self, event: &PlatformEvent) -> Result<(), sqlx::Error> {
        for &user_id in &event.recipients {
            self.route_to_user(user_id, event).await?;
        }
        Ok(())
    }

    /// Evaluate the user's policy and create/push the notification.
    async fn route_to_user(&self, user_id: DbId, event: &PlatformEvent) -> Result<(), sqlx::Error> {
        let eligible = self
            .resolver
            .should_send(user_id, &event.kind, Channel::InApp.as_str())
            .await?;
        if !eligible {
            tracing::debug!(user_id, kind = %event.kind, "Recipient ineligible, skipping");
            return Ok(());
        }

        let row = NotificationRepo::create(
            &self.pool,
            &CreateNotification {
                user_id,
                message: event.message.clone(),
                kind: Some(event.kind.clone()),
                link: event.link.clone(),
            },
        )
        .await?;

        let push = ClientEvent::new(
            "notification.created",
            serde_json::json!({
                "notification": row,
                "timestamp": event.timestamp,
            }),
        );
        send_best_effort(self.delivery.as_ref(), user_id, &push).await;

        Ok(())
    }
}
