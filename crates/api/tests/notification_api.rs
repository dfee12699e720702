//! Integration tests for the notification feed, bulk mutations, and CSV
//! export, run against a real database via `sqlx::test`.

mod common;

use std::collections::HashSet;

use axum::extract::ws::Message;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use common::{body_json, body_text, get, post, post_json, seed_notification};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Feed: offset mode
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn offset_feed_is_scoped_to_the_requesting_user(pool: PgPool) {
    seed_notification(&pool, 1, "deploy finished", Some("system")).await;
    seed_notification(&pool, 1, "invoice ready", Some("billing")).await;
    seed_notification(&pool, 1, "ticket assigned", None).await;
    seed_notification(&pool, 2, "someone else's row", None).await;

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/notifications", 1).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["total_count"], 3);
    assert_eq!(json["data"]["notifications"].as_array().unwrap().len(), 3);
    assert_eq!(json["data"]["has_more"], false);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn offset_feed_reports_has_more_past_the_limit(pool: PgPool) {
    for i in 0..4 {
        seed_notification(&pool, 1, &format!("row {i}"), None).await;
    }

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/notifications?limit=3", 1).await;
    let json = body_json(response).await;

    assert_eq!(json["data"]["notifications"].as_array().unwrap().len(), 3);
    assert_eq!(json["data"]["total_count"], 4);
    assert_eq!(json["data"]["has_more"], true);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn search_terms_and_exclusions_filter_the_feed(pool: PgPool) {
    seed_notification(&pool, 1, "urgent disk failure on db-1", Some("system")).await;
    seed_notification(&pool, 1, "urgent spam offer", None).await;
    seed_notification(&pool, 1, "weekly usage report", Some("billing")).await;

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/notifications?q=urgent%20-spam", 1).await;
    let json = body_json(response).await;

    let rows = json["data"]["notifications"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["message"], "urgent disk failure on db-1");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn kind_and_status_filters_combine(pool: PgPool) {
    let billing_id = seed_notification(&pool, 1, "invoice ready", Some("billing")).await;
    seed_notification(&pool, 1, "invoice overdue", Some("billing")).await;
    seed_notification(&pool, 1, "deploy finished", Some("system")).await;

    sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
        .bind(billing_id)
        .execute(&pool)
        .await
        .unwrap();

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/notifications?type=billing&status=unread", 1).await;
    let json = body_json(response).await;

    let rows = json["data"]["notifications"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["message"], "invoice overdue");
}

// ---------------------------------------------------------------------------
// Feed: cursor mode
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn cursor_pagination_walks_every_row_exactly_once(pool: PgPool) {
    for i in 0..5 {
        seed_notification(&pool, 1, &format!("row {i}"), None).await;
    }

    let mut seen = HashSet::new();
    let mut pages = 0;
    // An empty cursor parameter requests the first keyset page.
    let mut uri = "/api/v1/notifications?cursor=&limit=2".to_string();

    loop {
        let app = common::build_test_app(pool.clone());
        let response = get(app, &uri, 1).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        let rows = json["data"]["notifications"].as_array().unwrap();
        assert!(rows.len() <= 2);
        pages += 1;

        for row in rows {
            let id = row["id"].as_i64().unwrap();
            assert!(seen.insert(id), "row {id} appeared on two pages");
        }

        match json["data"]["next_cursor"].as_str() {
            Some(token) => {
                assert_eq!(json["data"]["has_more"], true);
                uri = format!("/api/v1/notifications?cursor={token}&limit=2");
            }
            None => {
                assert_eq!(json["data"]["has_more"], false);
                break;
            }
        }
    }

    assert_eq!(seen.len(), 5);
    assert_eq!(pages, 3);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn malformed_cursor_is_a_bad_request(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/notifications?cursor=not-a-cursor", 1).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Single mutations
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn mark_read_flips_the_row_and_returns_no_content(pool: PgPool) {
    let id = seed_notification(&pool, 1, "deploy finished", None).await;

    let app = common::build_test_app(pool.clone());
    let response = post(app, &format!("/api/v1/notifications/{id}/read"), 1).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let is_read: bool = sqlx::query_scalar("SELECT is_read FROM notifications WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(is_read);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn mark_read_rejects_another_users_row(pool: PgPool) {
    let id = seed_notification(&pool, 2, "not yours", None).await;

    let app = common::build_test_app(pool.clone());
    let response = post(app, &format!("/api/v1/notifications/{id}/read"), 1).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let is_read: bool = sqlx::query_scalar("SELECT is_read FROM notifications WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!is_read, "another user's request must not touch the row");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unread_count_reflects_read_state(pool: PgPool) {
    let id = seed_notification(&pool, 1, "one", None).await;
    seed_notification(&pool, 1, "two", None).await;

    let app = common::build_test_app(pool.clone());
    post(app, &format!("/api/v1/notifications/{id}/read"), 1).await;

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/notifications/unread-count", 1).await;
    let json = body_json(response).await;

    assert_eq!(json["data"]["count"], 1);
}

// ---------------------------------------------------------------------------
// Bulk mutations
// ---------------------------------------------------------------------------

// The test config sets the bulk batch size to 2, so five ids must run as
// three sequential batches.
#[sqlx::test(migrations = "../db/migrations")]
async fn bulk_read_runs_in_batches_and_fans_out(pool: PgPool) {
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(seed_notification(&pool, 1, &format!("row {i}"), None).await);
    }

    let (app, ws_manager) = common::build_test_app_parts(pool.clone());
    let mut rx = ws_manager.add("test-conn".into(), 1).await;

    let response = post_json(
        app,
        "/api/v1/notifications/bulk/read",
        1,
        serde_json::json!({ "ids": ids }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["count"], 5);
    assert_eq!(json["data"]["batches"], 3);

    let unread: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = 1 AND NOT is_read")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(unread, 0);

    // The owner's live connection receives a single summary frame.
    let frame = rx.try_recv().expect("expected a fan-out frame");
    let text = match frame {
        Message::Text(text) => text.to_string(),
        other => panic!("expected a text frame, got {other:?}"),
    };
    let event: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(event["name"], "notifications.bulk_read");
    assert_eq!(event["payload"]["count"], 5);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn bulk_read_with_no_ids_is_a_no_op(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/notifications/bulk/read",
        1,
        serde_json::json!({ "ids": [] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["count"], 0);
    assert_eq!(json["data"]["batches"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn bulk_read_skips_other_users_rows(pool: PgPool) {
    let mine = seed_notification(&pool, 1, "mine", None).await;
    let theirs = seed_notification(&pool, 2, "theirs", None).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/notifications/bulk/read",
        1,
        serde_json::json!({ "ids": [mine, theirs] }),
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["data"]["count"], 1);

    let theirs_read: bool = sqlx::query_scalar("SELECT is_read FROM notifications WHERE id = $1")
        .bind(theirs)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!theirs_read);
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn export_returns_csv_with_quoting(pool: PgPool) {
    seed_notification(&pool, 1, "disk \"sda\" degraded", Some("system")).await;
    seed_notification(&pool, 2, "someone else's row", None).await;

    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/notifications/export", 1).await;
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get(CONTENT_TYPE).unwrap();
    assert_eq!(content_type, "text/csv; charset=utf-8");

    let disposition = response
        .headers()
        .get(CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment; filename="));

    let body = body_text(response).await;
    let mut lines = body.lines();
    assert_eq!(
        lines.next(),
        Some("ID,Message,Type,Status,Created At,Updated At,Link")
    );
    let row = lines.next().unwrap();
    assert!(row.contains("\"disk \"\"sda\"\" degraded\""));
    assert!(lines.next().is_none(), "export must only cover the caller");
}
