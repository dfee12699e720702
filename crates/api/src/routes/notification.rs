//! Route definitions for the `/notifications` resource.
//!
//! All endpoints require authentication.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{notification, preference};
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                 -> list_notifications (search, filter, paginate)
/// GET    /unread-count     -> unread_count
/// GET    /export           -> export_csv
///
/// POST   /{id}/read        -> mark_read
/// POST   /{id}/unread      -> mark_unread
/// DELETE /{id}             -> delete_notification
///
/// POST   /bulk/read        -> bulk_read
/// POST   /bulk/unread      -> bulk_unread
/// POST   /bulk/delete      -> bulk_delete
/// POST   /read-all         -> mark_all_read
/// POST   /unread-all       -> mark_all_unread
/// DELETE /kind/{kind}      -> delete_by_kind
///
/// GET    /preferences      -> get_preferences
/// PUT    /preferences      -> update_preferences
/// DELETE /preferences      -> delete_preferences
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        // Feed and export endpoints
        .route("/", get(notification::list_notifications))
        .route("/unread-count", get(notification::unread_count))
        .route("/export", get(notification::export_csv))
        // Single-item mutations
        .route("/{id}/read", post(notification::mark_read))
        .route("/{id}/unread", post(notification::mark_unread))
        .route("/{id}", delete(notification::delete_notification))
        // Bulk mutations
        .route("/bulk/read", post(notification::bulk_read))
        .route("/bulk/unread", post(notification::bulk_unread))
        .route("/bulk/delete", post(notification::bulk_delete))
        .route("/read-all", post(notification::mark_all_read))
        .route("/unread-all", post(notification::mark_all_unread))
        .route("/kind/{kind}", delete(notification::delete_by_kind))
        // Preferences endpoints
        .route(
            "/preferences",
            get(preference::get_preferences)
                .put(preference::update_preferences)
                .delete(preference::delete_preferences),
        )
}
