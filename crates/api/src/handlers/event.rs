//! Internal event-ingestion endpoint.
//!
//! Business services publish platform events here; the notification router
//! consumes them from the bus and creates notification rows for eligible
//! recipients asynchronously.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use opsdesk_core::types::DbId;
use opsdesk_events::PlatformEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Request body for `POST /events`.
#[derive(Debug, Deserialize)]
pub struct PublishEvent {
    pub kind: String,
    pub message: String,
    pub recipients: Vec<DbId>,
    pub link: Option<String>,
    pub payload: Option<serde_json::Value>,
}

/// POST /api/v1/events
///
/// Publish a platform event onto the bus. Notification creation happens
/// asynchronously in the router, so this returns 202 Accepted.
pub async fn publish_event(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<PublishEvent>,
) -> AppResult<impl IntoResponse> {
    if body.kind.trim().is_empty() {
        return Err(AppError::BadRequest("Event kind must not be empty".into()));
    }
    if body.recipients.is_empty() {
        return Err(AppError::BadRequest(
            "Event must name at least one recipient".into(),
        ));
    }

    let mut event = PlatformEvent::new(body.kind, body.message)
        .for_users(body.recipients)
        .with_actor(auth.user_id);
    if let Some(link) = body.link {
        event = event.with_link(link);
    }
    if let Some(payload) = body.payload {
        event = event.with_payload(payload);
    }

    tracing::debug!(kind = %event.kind, recipients = event.recipients.len(), "Event published");
    state.event_bus.publish(event);

    Ok(StatusCode::ACCEPTED)
}
