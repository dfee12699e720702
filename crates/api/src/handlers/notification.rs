//! Handlers for the `/notifications` resource.
//!
//! All endpoints require authentication via [`AuthUser`].

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use opsdesk_core::error::CoreError;
use opsdesk_core::export::{self, ExportRow};
use opsdesk_core::query::{self, Cursor, PageRequest, QueryOptions, ReadStatus, SortOrder};
use opsdesk_core::search::{clamp_limit, clamp_offset};
use opsdesk_core::types::{DbId, Timestamp};
use opsdesk_db::models::notification::Notification;
use opsdesk_db::repositories::{FeedPage, NotificationRepo};
use opsdesk_events::channel::send_best_effort;
use opsdesk_events::ClientEvent;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::notifications::BulkProcessor;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query / request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /notifications`.
///
/// Pagination is offset-based by default; sending `cursor` (even empty, for
/// the first page) switches to keyset pagination.
#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    /// Free-text search query (advanced grammar: `AND`/`OR`, `-term`,
    /// `type:kind`).
    pub q: Option<String>,
    /// Comma-separated kind filter, merged with `type:` search tokens.
    #[serde(rename = "type")]
    pub kinds: Option<String>,
    /// Read-status filter: `read` or `unread`.
    pub status: Option<ReadStatus>,
    /// Inclusive lower bound on creation time (RFC 3339).
    pub date_from: Option<Timestamp>,
    /// Inclusive upper bound on creation time (RFC 3339).
    pub date_to: Option<Timestamp>,
    /// Sort order: `newest` (default), `oldest`, or `type`.
    pub sort: Option<SortOrder>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip (offset mode only). Defaults to 0.
    pub offset: Option<i64>,
    /// Continuation token from a previous page (cursor mode).
    pub cursor: Option<String>,
}

/// Request body for the bulk id endpoints.
#[derive(Debug, Deserialize)]
pub struct BulkIds {
    pub ids: Vec<DbId>,
}

/// Offset-mode feed payload.
#[derive(Debug, Serialize)]
pub struct OffsetFeed {
    pub notifications: Vec<Notification>,
    pub total_count: i64,
    pub has_more: bool,
}

/// Cursor-mode feed payload.
#[derive(Debug, Serialize)]
pub struct CursorFeed {
    pub notifications: Vec<Notification>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Result of a batched bulk mutation.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub count: u64,
    pub batches: u64,
}

/// Affected-row count for whole-feed mutations.
#[derive(Debug, Serialize)]
pub struct MutationCount {
    pub count: u64,
}

/// Unread-notification count.
#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

impl FeedParams {
    fn options(&self) -> QueryOptions {
        let kinds = self
            .kinds
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        QueryOptions {
            kinds,
            status: self.status,
            date_from: self.date_from,
            date_to: self.date_to,
            sort: self.sort.unwrap_or_default(),
        }
    }

    fn page(&self) -> Result<PageRequest, CoreError> {
        let limit = clamp_limit(self.limit);
        match self.cursor.as_deref() {
            Some("") => Ok(PageRequest::Cursor { cursor: None, limit }),
            Some(token) => Ok(PageRequest::Cursor {
                cursor: Some(Cursor::decode(token)?),
                limit,
            }),
            None => Ok(PageRequest::Offset {
                limit,
                offset: clamp_offset(self.offset),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications
///
/// List or search the authenticated user's notifications.
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<FeedParams>,
) -> AppResult<Response> {
    let page = params.page().map_err(AppError::Core)?;
    let search = params.q.as_deref().unwrap_or("");
    let query = query::compile(auth.user_id, search, params.options(), page)
        .map_err(AppError::Core)?;

    let response = match NotificationRepo::execute(&state.pool, &query).await? {
        FeedPage::Offset(page) => Json(DataResponse {
            data: OffsetFeed {
                notifications: page.rows,
                total_count: page.total_count,
                has_more: page.has_more,
            },
        })
        .into_response(),
        FeedPage::Cursor(page) => Json(DataResponse {
            data: CursorFeed {
                next_cursor: page.next_cursor.map(|c| c.encode()),
                notifications: page.rows,
                has_more: page.has_more,
            },
        })
        .into_response(),
    };
    Ok(response)
}

/// GET /api/v1/notifications/unread-count
///
/// Return the number of unread notifications for the authenticated user.
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UnreadCount>>> {
    let count = NotificationRepo::unread_count(&state.pool, auth.user_id).await?;

    Ok(Json(DataResponse {
        data: UnreadCount { count },
    }))
}

// ---------------------------------------------------------------------------
// Single-item mutations
// ---------------------------------------------------------------------------

/// POST /api/v1/notifications/{id}/read
///
/// Mark a single notification as read. Returns 204 No Content on success,
/// or 404 if the notification does not belong to the authenticated user.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    set_single_read(&state, auth.user_id, notification_id, true).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/notifications/{id}/unread
///
/// Mark a single notification as unread.
pub async fn mark_unread(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    set_single_read(&state, auth.user_id, notification_id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_single_read(
    state: &AppState,
    user_id: DbId,
    notification_id: DbId,
    is_read: bool,
) -> AppResult<()> {
    let found = NotificationRepo::set_read(&state.pool, notification_id, user_id, is_read).await?;
    if !found {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        }));
    }
    let name = if is_read {
        "notification.read"
    } else {
        "notification.unread"
    };
    let event = ClientEvent::new(name, serde_json::json!({ "id": notification_id }));
    send_best_effort(state.delivery.as_ref(), user_id, &event).await;
    Ok(())
}

/// DELETE /api/v1/notifications/{id}
///
/// Delete a single notification owned by the authenticated user.
pub async fn delete_notification(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let found = NotificationRepo::delete(&state.pool, notification_id, auth.user_id).await?;
    if !found {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        }));
    }
    let event = ClientEvent::new(
        "notification.deleted",
        serde_json::json!({ "id": notification_id }),
    );
    send_best_effort(state.delivery.as_ref(), auth.user_id, &event).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Bulk mutations
// ---------------------------------------------------------------------------

fn bulk_processor(state: &AppState) -> BulkProcessor {
    BulkProcessor::new(
        state.pool.clone(),
        state.delivery.clone(),
        state.config.bulk_batch_size,
    )
}

/// POST /api/v1/notifications/bulk/read
///
/// Mark a set of notifications as read, in bounded batches.
pub async fn bulk_read(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<BulkIds>,
) -> AppResult<Json<DataResponse<BatchSummary>>> {
    let outcome = bulk_processor(&state).set_read(&body.ids, true).await?;

    Ok(Json(DataResponse {
        data: BatchSummary {
            count: outcome.count,
            batches: outcome.batches,
        },
    }))
}

/// POST /api/v1/notifications/bulk/unread
///
/// Mark a set of notifications as unread, in bounded batches.
pub async fn bulk_unread(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<BulkIds>,
) -> AppResult<Json<DataResponse<BatchSummary>>> {
    let outcome = bulk_processor(&state).set_read(&body.ids, false).await?;

    Ok(Json(DataResponse {
        data: BatchSummary {
            count: outcome.count,
            batches: outcome.batches,
        },
    }))
}

/// POST /api/v1/notifications/bulk/delete
///
/// Delete a set of notifications, in bounded batches.
pub async fn bulk_delete(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(body): Json<BulkIds>,
) -> AppResult<Json<DataResponse<BatchSummary>>> {
    let outcome = bulk_processor(&state).delete(&body.ids).await?;

    Ok(Json(DataResponse {
        data: BatchSummary {
            count: outcome.count,
            batches: outcome.batches,
        },
    }))
}

/// POST /api/v1/notifications/read-all
///
/// Mark all of the authenticated user's notifications as read.
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<MutationCount>>> {
    let count = bulk_processor(&state).set_read_all(auth.user_id, true).await?;

    Ok(Json(DataResponse {
        data: MutationCount { count },
    }))
}

/// POST /api/v1/notifications/unread-all
///
/// Mark all of the authenticated user's notifications as unread.
pub async fn mark_all_unread(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<MutationCount>>> {
    let count = bulk_processor(&state)
        .set_read_all(auth.user_id, false)
        .await?;

    Ok(Json(DataResponse {
        data: MutationCount { count },
    }))
}

/// DELETE /api/v1/notifications/kind/{kind}
///
/// Delete every notification of one kind from the authenticated user's feed.
pub async fn delete_by_kind(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> AppResult<Json<DataResponse<MutationCount>>> {
    let count = bulk_processor(&state)
        .delete_by_kind(auth.user_id, &kind)
        .await?;

    Ok(Json(DataResponse {
        data: MutationCount { count },
    }))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// GET /api/v1/notifications/export
///
/// Download the authenticated user's entire feed as a CSV attachment.
pub async fn export_csv(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let rows = NotificationRepo::list_for_export(&state.pool, auth.user_id).await?;
    let rows: Vec<ExportRow> = rows
        .into_iter()
        .map(|n| ExportRow {
            id: n.id,
            message: n.message,
            kind: n.kind,
            is_read: n.is_read,
            created_at: n.created_at,
            updated_at: n.updated_at,
            link: n.link,
        })
        .collect();

    let body = export::render(&rows);
    let filename = export::filename(auth.user_id, state.clock.now());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn absent_cursor_selects_offset_mode() {
        let params = FeedParams {
            limit: Some(20),
            offset: Some(40),
            ..Default::default()
        };
        assert_matches!(
            params.page(),
            Ok(PageRequest::Offset { limit: 20, offset: 40 })
        );
    }

    #[test]
    fn empty_cursor_selects_first_keyset_page() {
        let params = FeedParams {
            cursor: Some(String::new()),
            ..Default::default()
        };
        assert_matches!(
            params.page(),
            Ok(PageRequest::Cursor { cursor: None, limit: 50 })
        );
    }

    #[test]
    fn cursor_token_is_decoded() {
        let params = FeedParams {
            cursor: Some("1700000000000000.9".into()),
            ..Default::default()
        };
        assert_matches!(
            params.page(),
            Ok(PageRequest::Cursor {
                cursor: Some(Cursor { id: 9, .. }),
                ..
            })
        );
    }

    #[test]
    fn malformed_cursor_token_is_rejected() {
        let params = FeedParams {
            cursor: Some("not-a-cursor".into()),
            ..Default::default()
        };
        assert_matches!(params.page(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn kind_list_is_split_and_trimmed() {
        let params = FeedParams {
            kinds: Some("billing, security,,urgent".into()),
            ..Default::default()
        };
        assert_eq!(
            params.options().kinds,
            vec!["billing", "security", "urgent"]
        );
    }
}
