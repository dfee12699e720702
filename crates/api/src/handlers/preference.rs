//! Handlers for the `/notifications/preferences` resource.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use opsdesk_db::models::notification::{NotificationPreference, UpdatePreferences};
use opsdesk_db::repositories::NotificationPreferenceRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Payload for `GET /preferences`; `preferences` is `null` when the user
/// has no stored record.
#[derive(Debug, Serialize)]
pub struct PreferencesPayload {
    pub preferences: Option<NotificationPreference>,
}

/// GET /api/v1/notifications/preferences
///
/// Return the authenticated user's stored preference record. A user who
/// never saved preferences has no record; the response carries `null` and
/// the client renders system defaults.
pub async fn get_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<PreferencesPayload>>> {
    let prefs = NotificationPreferenceRepo::get(&state.pool, auth.user_id).await?;

    Ok(Json(DataResponse {
        data: PreferencesPayload { preferences: prefs },
    }))
}

/// PUT /api/v1/notifications/preferences
///
/// Create or partially update the authenticated user's preference record.
/// Omitted fields keep their stored value (or the system default on first
/// save). Returns the full record after the change.
pub async fn update_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(patch): Json<UpdatePreferences>,
) -> AppResult<Json<DataResponse<NotificationPreference>>> {
    let prefs = NotificationPreferenceRepo::upsert(&state.pool, auth.user_id, &patch).await?;

    Ok(Json(DataResponse { data: prefs }))
}

/// DELETE /api/v1/notifications/preferences
///
/// Remove the authenticated user's preference record, reverting them to
/// system defaults. Deleting an absent record is a no-op.
pub async fn delete_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let existed = NotificationPreferenceRepo::delete(&state.pool, auth.user_id).await?;
    tracing::debug!(user_id = auth.user_id, existed, "Preferences reset");

    Ok(StatusCode::NO_CONTENT)
}
