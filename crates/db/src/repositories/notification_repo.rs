//! Repository for the `notifications` table.
//!
//! This module owns the single lowering point from the backend-agnostic
//! [`NotificationQuery`] (predicate tree + ordering + page request) to SQL,
//! via `sqlx::QueryBuilder`. The grammar semantics it must agree with are
//! defined by `FilterExpression::matches` in `opsdesk-core`.

use sqlx::{PgPool, Postgres, QueryBuilder};

use opsdesk_core::query::{
    CursorPage, NotificationQuery, OffsetPage, PageRequest, SortOrder,
};
use opsdesk_core::search::Filter;
use opsdesk_core::types::DbId;

use crate::models::notification::{CreateNotification, Notification, NotificationPatch};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, user_id, message, kind, is_read, link, created_at, updated_at";

/// One page of feed results, shaped by the query's page request.
#[derive(Debug)]
pub enum FeedPage {
    Offset(OffsetPage<Notification>),
    Cursor(CursorPage<Notification>),
}

/// Provides CRUD and feed-query operations for notifications.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Create a notification, returning the stored row.
    pub async fn create(
        pool: &PgPool,
        body: &CreateNotification,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (user_id, message, kind, link) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(body.user_id)
            .bind(&body.message)
            .bind(&body.kind)
            .bind(&body.link)
            .fetch_one(pool)
            .await
    }

    /// Find a single notification owned by the given user.
    pub async fn find_for_user(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1 AND user_id = $2");
        sqlx::query_as::<_, Notification>(&query)
            .bind(notification_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Feed queries (offset and cursor pagination)
    // -----------------------------------------------------------------------

    /// Execute a compiled feed query in whichever page mode it carries.
    ///
    /// Offset mode issues one COUNT and one fetch; cursor mode issues one
    /// `limit + 1` fetch with a keyset boundary and assembles the
    /// continuation metadata in `opsdesk-core`.
    pub async fn execute(pool: &PgPool, query: &NotificationQuery) -> Result<FeedPage, sqlx::Error> {
        match query.page {
            PageRequest::Offset { limit, offset } => {
                let mut count_qb = filtered("SELECT COUNT(*) FROM notifications WHERE ", query);
                let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

                let mut qb = filtered(
                    &format!("SELECT {COLUMNS} FROM notifications WHERE "),
                    query,
                );
                push_order_by(&mut qb, query.sort);
                qb.push(" LIMIT ").push_bind(limit);
                qb.push(" OFFSET ").push_bind(offset);
                let rows = qb.build_query_as::<Notification>().fetch_all(pool).await?;

                Ok(FeedPage::Offset(OffsetPage::assemble(
                    rows, total, limit, offset,
                )))
            }
            PageRequest::Cursor { cursor, limit } => {
                let mut qb = filtered(
                    &format!("SELECT {COLUMNS} FROM notifications WHERE "),
                    query,
                );
                if let Some(cursor) = cursor {
                    let op = if query.sort.is_descending() { " < (" } else { " > (" };
                    qb.push(" AND (created_at, id)").push(op);
                    qb.push_bind(cursor.created_at);
                    qb.push(", ");
                    qb.push_bind(cursor.id);
                    qb.push(")");
                }
                push_order_by(&mut qb, query.sort);
                qb.push(" LIMIT ").push_bind(limit + 1);
                let rows = qb.build_query_as::<Notification>().fetch_all(pool).await?;

                Ok(FeedPage::Cursor(CursorPage::assemble(
                    rows,
                    limit as usize,
                    Notification::cursor,
                )))
            }
        }
    }

    /// List a user's entire feed, newest first, for CSV export.
    pub async fn list_for_export(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications \
             WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Single-row mutations
    // -----------------------------------------------------------------------

    /// Set the read flag on a single notification owned by the user.
    ///
    /// Returns `true` if a row was updated.
    pub async fn set_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
        is_read: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = $3, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(notification_id)
        .bind(user_id)
        .bind(is_read)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a single notification owned by the user.
    pub async fn delete(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Get the number of unread notifications for a user.
    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    // -----------------------------------------------------------------------
    // Bulk mutations
    // -----------------------------------------------------------------------

    /// Apply a partial patch to a set of notifications.
    ///
    /// `None` patch fields keep their current value (COALESCE). Returns the
    /// number of affected rows.
    pub async fn update_many(
        pool: &PgPool,
        ids: &[DbId],
        patch: &NotificationPatch,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = COALESCE($2, is_read), updated_at = NOW() \
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(patch.is_read)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Set the read flag on every notification of a user.
    pub async fn set_read_all(
        pool: &PgPool,
        user_id: DbId,
        is_read: bool,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = $2, updated_at = NOW() \
             WHERE user_id = $1 AND is_read <> $2",
        )
        .bind(user_id)
        .bind(is_read)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete a set of notifications by id.
    pub async fn delete_many(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every notification of a given kind owned by the user.
    pub async fn delete_by_kind(
        pool: &PgPool,
        user_id: DbId,
        kind: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notifications WHERE user_id = $1 AND kind = $2")
            .bind(user_id)
            .bind(kind)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// The distinct owners of the given notification ids.
    ///
    /// Used for side-channel event fan-out after (or, for deletes, before)
    /// a bulk mutation.
    pub async fn distinct_user_ids(pool: &PgPool, ids: &[DbId]) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar("SELECT DISTINCT user_id FROM notifications WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// Query lowering
// ---------------------------------------------------------------------------

/// Start a builder with `select` and push every WHERE constraint of the
/// query: owner, read status, date range, AND filters, and the top-level OR
/// group when present.
fn filtered(select: &str, query: &NotificationQuery) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(select);
    qb.push("user_id = ").push_bind(query.user_id);

    if let Some(status) = query.status {
        qb.push(" AND is_read = ").push_bind(status.as_bool());
    }
    if let Some(from) = query.date_from {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = query.date_to {
        qb.push(" AND created_at <= ").push_bind(to);
    }

    for filter in &query.expr.and {
        qb.push(" AND ");
        push_filter(&mut qb, filter);
    }

    if !query.expr.or.is_empty() {
        qb.push(" AND (");
        for (i, filter) in query.expr.or.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            push_filter(&mut qb, filter);
        }
        qb.push(")");
    }

    qb
}

/// Lower one predicate to SQL.
///
/// `kind` is nullable, so both containment directions go through
/// `COALESCE(kind, '')` to keep `Exclude` three-valued-logic-safe.
fn push_filter(qb: &mut QueryBuilder<'static, Postgres>, filter: &Filter) {
    match filter {
        Filter::Include(term) => {
            let pattern = like_pattern(term);
            qb.push("(message ILIKE ").push_bind(pattern.clone());
            qb.push(" OR COALESCE(kind, '') ILIKE ").push_bind(pattern);
            qb.push(")");
        }
        Filter::Exclude(term) => {
            let pattern = like_pattern(term);
            qb.push("NOT (message ILIKE ").push_bind(pattern.clone());
            qb.push(" OR COALESCE(kind, '') ILIKE ").push_bind(pattern);
            qb.push(")");
        }
        Filter::TypeIn(kinds) => {
            qb.push("kind = ANY(").push_bind(kinds.clone());
            qb.push(")");
        }
    }
}

/// `%term%` with LIKE metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Push the ORDER BY clause for a sort order.
///
/// `id` is always the final tiebreak so cursor boundaries are total.
fn push_order_by(qb: &mut QueryBuilder<'static, Postgres>, sort: SortOrder) {
    match sort {
        SortOrder::Newest => qb.push(" ORDER BY created_at DESC, id DESC"),
        SortOrder::Oldest => qb.push(" ORDER BY created_at ASC, id ASC"),
        SortOrder::ByType => qb.push(" ORDER BY kind ASC, created_at DESC, id DESC"),
    };
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
