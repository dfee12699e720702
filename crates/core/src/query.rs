//! Backend-agnostic notification queries and cursor-pagination primitives.
//!
//! [`compile`] merges a parsed [`FilterExpression`] with the structural
//! filters of a request (kinds, read status, date range, sort) into a
//! [`NotificationQuery`] — a predicate tree plus ordering plus a page
//! request. The repository layer in `opsdesk-db` lowers this to SQL; no SQL
//! concepts leak into this module.

use serde::Deserialize;

use crate::error::CoreError;
use crate::search::{self, FilterExpression};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Structural filters
// ---------------------------------------------------------------------------

/// Read-status constraint for a feed query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    Read,
    Unread,
}

impl ReadStatus {
    /// The `is_read` column value this status constrains to.
    pub fn as_bool(self) -> bool {
        matches!(self, ReadStatus::Read)
    }
}

/// Sort order for a feed query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Most recent first (the default).
    #[default]
    Newest,
    /// Oldest first.
    Oldest,
    /// Ascending by kind, most recent first within a kind.
    #[serde(rename = "type")]
    ByType,
}

impl SortOrder {
    /// Whether the primary time ordering is descending.
    pub fn is_descending(self) -> bool {
        !matches!(self, SortOrder::Oldest)
    }
}

/// Structural (non-grammar) filters accompanying a search request.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Explicitly selected kinds, merged with `type:` search tokens.
    pub kinds: Vec<String>,
    /// Optional read/unread constraint.
    pub status: Option<ReadStatus>,
    /// Inclusive lower bound on `created_at`.
    pub date_from: Option<Timestamp>,
    /// Inclusive upper bound on `created_at`.
    pub date_to: Option<Timestamp>,
    /// Sort order; defaults to newest-first.
    pub sort: SortOrder,
}

// ---------------------------------------------------------------------------
// Pagination requests
// ---------------------------------------------------------------------------

/// How a page of results is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// Classic count-and-skip pagination.
    Offset { limit: i64, offset: i64 },
    /// Keyset pagination from an optional continuation cursor.
    Cursor { cursor: Option<Cursor>, limit: i64 },
}

/// An opaque continuation token for cursor pagination.
///
/// Keyed on the composite `(created_at, id)` so pages stay stable even when
/// the id scheme is not chronologically monotonic. A cursor is only valid
/// under the ordering it was produced with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: Timestamp,
    pub id: DbId,
}

impl Cursor {
    /// Encode as the wire token `"{created_at_micros}.{id}"`.
    pub fn encode(&self) -> String {
        format!("{}.{}", self.created_at.timestamp_micros(), self.id)
    }

    /// Decode a wire token produced by [`Cursor::encode`].
    pub fn decode(token: &str) -> Result<Self, CoreError> {
        let (micros, id) = token
            .split_once('.')
            .ok_or_else(|| CoreError::Validation(format!("Malformed cursor: {token}")))?;
        let micros: i64 = micros
            .parse()
            .map_err(|_| CoreError::Validation(format!("Malformed cursor: {token}")))?;
        let id: DbId = id
            .parse()
            .map_err(|_| CoreError::Validation(format!("Malformed cursor: {token}")))?;
        let created_at = chrono::DateTime::from_timestamp_micros(micros)
            .ok_or_else(|| CoreError::Validation(format!("Cursor timestamp out of range: {token}")))?;
        Ok(Cursor { created_at, id })
    }
}

// ---------------------------------------------------------------------------
// Compiled query
// ---------------------------------------------------------------------------

/// A fully compiled, backend-agnostic notification query.
///
/// `expr.and` entries and the structural constraints combine under logical
/// AND; a non-empty `expr.or` list attaches as one additional top-level OR
/// group (a row must satisfy at least one of its entries).
#[derive(Debug, Clone)]
pub struct NotificationQuery {
    pub user_id: DbId,
    pub expr: FilterExpression,
    pub status: Option<ReadStatus>,
    pub date_from: Option<Timestamp>,
    pub date_to: Option<Timestamp>,
    pub sort: SortOrder,
    pub page: PageRequest,
}

/// Compile a search string and structural filters into a query.
///
/// The search grammar is handled by [`search::parse`]; explicit kinds from
/// `options` are merged into the expression's `TypeIn` filter there.
///
/// Cursor pagination is only defined for the single-key time orderings
/// (`Newest`/`Oldest`); combining it with [`SortOrder::ByType`] is a
/// validation error.
pub fn compile(
    user_id: DbId,
    search: &str,
    options: QueryOptions,
    page: PageRequest,
) -> Result<NotificationQuery, CoreError> {
    if matches!(page, PageRequest::Cursor { .. }) && options.sort == SortOrder::ByType {
        return Err(CoreError::Validation(
            "Cursor pagination is not supported with sort=type".into(),
        ));
    }

    let expr = search::parse(search, &options.kinds);

    Ok(NotificationQuery {
        user_id,
        expr,
        status: options.status,
        date_from: options.date_from,
        date_to: options.date_to,
        sort: options.sort,
        page,
    })
}

// ---------------------------------------------------------------------------
// Cursor page assembly
// ---------------------------------------------------------------------------

/// A page of rows produced by cursor pagination.
#[derive(Debug, Clone)]
pub struct CursorPage<T> {
    pub rows: Vec<T>,
    pub has_more: bool,
    pub next_cursor: Option<Cursor>,
}

impl<T> CursorPage<T> {
    /// Assemble a page from a `limit + 1` over-fetch.
    ///
    /// When more than `limit` rows came back, the surplus is trimmed and the
    /// next cursor is the key of the last kept row; re-querying with it must
    /// never return a row already seen under the same ordering.
    pub fn assemble(mut rows: Vec<T>, limit: usize, key: impl Fn(&T) -> Cursor) -> Self {
        let has_more = rows.len() > limit;
        if has_more {
            rows.truncate(limit);
        }
        let next_cursor = if has_more {
            rows.last().map(&key)
        } else {
            None
        };
        CursorPage {
            rows,
            has_more,
            next_cursor,
        }
    }
}

/// A page of rows produced by offset pagination.
#[derive(Debug, Clone)]
pub struct OffsetPage<T> {
    pub rows: Vec<T>,
    pub total_count: i64,
    pub has_more: bool,
}

impl<T> OffsetPage<T> {
    /// Assemble a page from a fetch plus a separate total count.
    pub fn assemble(rows: Vec<T>, total_count: i64, limit: i64, offset: i64) -> Self {
        OffsetPage {
            rows,
            total_count,
            has_more: offset + limit < total_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> Timestamp {
        chrono::Utc.timestamp_opt(secs, 0).unwrap()
    }

    // -- cursor encoding -----------------------------------------------------

    #[test]
    fn cursor_round_trips_through_token() {
        let cursor = Cursor {
            created_at: ts(1_700_000_000),
            id: 42,
        };
        let decoded = Cursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn malformed_cursor_is_rejected() {
        assert!(Cursor::decode("garbage").is_err());
        assert!(Cursor::decode("12.x").is_err());
        assert!(Cursor::decode("").is_err());
    }

    // -- compile -------------------------------------------------------------

    #[test]
    fn compile_defaults_to_newest() {
        let q = compile(
            1,
            "",
            QueryOptions::default(),
            PageRequest::Offset { limit: 50, offset: 0 },
        )
        .unwrap();
        assert_eq!(q.sort, SortOrder::Newest);
        assert!(q.expr.is_empty());
        assert!(q.status.is_none());
    }

    #[test]
    fn compile_rejects_cursor_with_type_sort() {
        let options = QueryOptions {
            sort: SortOrder::ByType,
            ..Default::default()
        };
        let err = compile(
            1,
            "",
            options,
            PageRequest::Cursor { cursor: None, limit: 50 },
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn compile_merges_explicit_kinds_into_expression() {
        let options = QueryOptions {
            kinds: vec!["billing".to_string()],
            ..Default::default()
        };
        let q = compile(
            1,
            "type:security",
            options,
            PageRequest::Offset { limit: 50, offset: 0 },
        )
        .unwrap();
        assert_eq!(
            q.expr.and,
            vec![crate::search::Filter::TypeIn(vec![
                "security".to_string(),
                "billing".to_string(),
            ])]
        );
    }

    // -- page assembly -------------------------------------------------------

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: DbId,
        created_at: Timestamp,
    }

    fn row(id: DbId) -> Row {
        Row {
            id,
            created_at: ts(1_000_000 + id),
        }
    }

    fn key(r: &Row) -> Cursor {
        Cursor {
            created_at: r.created_at,
            id: r.id,
        }
    }

    #[test]
    fn cursor_page_never_exceeds_limit() {
        let rows: Vec<Row> = (1..=6).map(row).collect();
        let page = CursorPage::assemble(rows, 5, key);
        assert_eq!(page.rows.len(), 5);
        assert!(page.has_more);
    }

    #[test]
    fn next_cursor_is_last_kept_row() {
        let rows: Vec<Row> = (1..=4).map(row).collect();
        let page = CursorPage::assemble(rows, 3, key);
        assert_eq!(page.next_cursor, Some(key(&row(3))));
    }

    #[test]
    fn exact_limit_means_no_more_pages() {
        let rows: Vec<Row> = (1..=3).map(row).collect();
        let page = CursorPage::assemble(rows, 3, key);
        assert_eq!(page.rows.len(), 3);
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn empty_fetch_yields_empty_page() {
        let page = CursorPage::assemble(Vec::<Row>::new(), 10, key);
        assert!(page.rows.is_empty());
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn successive_pages_never_overlap() {
        // Simulate descending-id pagination over ids 10..1 with limit 4.
        let all: Vec<Row> = (1..=10).rev().map(row).collect();
        let mut seen: Vec<DbId> = Vec::new();
        let mut cursor: Option<Cursor> = None;

        loop {
            let remaining: Vec<Row> = all
                .iter()
                .filter(|r| cursor.is_none_or(|c| (r.created_at, r.id) < (c.created_at, c.id)))
                .take(4 + 1)
                .cloned()
                .collect();
            let page = CursorPage::assemble(remaining, 4, key);
            for r in &page.rows {
                assert!(!seen.contains(&r.id), "row {} returned twice", r.id);
                seen.push(r.id);
            }
            match page.next_cursor {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }
        assert_eq!(seen, (1..=10).rev().collect::<Vec<_>>());
    }

    #[test]
    fn offset_page_has_more_arithmetic() {
        let page = OffsetPage::assemble(vec![1, 2, 3], 10, 3, 0);
        assert!(page.has_more);
        let page = OffsetPage::assemble(vec![1], 10, 3, 9);
        assert!(!page.has_more);
        let page = OffsetPage::assemble(Vec::<i32>::new(), 0, 3, 0);
        assert!(!page.has_more);
    }
}
