//! Shared harness for HTTP-level integration tests.
//!
//! [`build_test_app`] mirrors the router construction in `main.rs` so tests
//! exercise the same middleware stack (CORS, request ID, timeout, tracing,
//! panic recovery) that production uses. Requests are sent directly to the
//! router via `tower::ServiceExt` without a TCP listener.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use opsdesk_api::config::ServerConfig;
use opsdesk_api::notifications::SystemClock;
use opsdesk_api::routes;
use opsdesk_api::state::AppState;
use opsdesk_api::ws::WsManager;
use opsdesk_core::types::DbId;
use opsdesk_events::{DeliveryChannel, EventBus};

/// Build a test `ServerConfig` with safe defaults.
///
/// The bulk batch size is deliberately tiny (2) so a handful of seeded rows
/// is enough to exercise multi-batch behavior.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        bulk_batch_size: 2,
    }
}

/// Build the full application router plus the WebSocket manager backing its
/// delivery channel, so tests can register fake connections and observe
/// fan-out.
pub fn build_test_app_parts(pool: PgPool) -> (Router, Arc<WsManager>) {
    let config = test_config();
    let ws_manager = Arc::new(WsManager::new());
    let delivery = Some(Arc::clone(&ws_manager) as Arc<dyn DeliveryChannel>);

    let state = AppState {
        pool,
        config: Arc::new(config),
        ws_manager: Arc::clone(&ws_manager),
        delivery,
        event_bus: Arc::new(EventBus::default()),
        clock: Arc::new(SystemClock),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static("x-user-id")])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state);

    (app, ws_manager)
}

/// Build the application router alone.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_parts(pool).0
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    user_id: DbId,
    body: Option<serde_json::Value>,
) -> Response {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user_id.to_string());
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// GET `uri` as the given user.
pub async fn get(app: Router, uri: &str, user_id: DbId) -> Response {
    send(app, Method::GET, uri, user_id, None).await
}

/// POST `uri` with a JSON body as the given user.
pub async fn post_json(app: Router, uri: &str, user_id: DbId, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, user_id, Some(body)).await
}

/// POST `uri` with an empty body as the given user.
pub async fn post(app: Router, uri: &str, user_id: DbId) -> Response {
    send(app, Method::POST, uri, user_id, None).await
}

/// PUT `uri` with a JSON body as the given user.
pub async fn put_json(app: Router, uri: &str, user_id: DbId, body: serde_json::Value) -> Response {
    send(app, Method::PUT, uri, user_id, Some(body)).await
}

/// DELETE `uri` as the given user.
pub async fn delete(app: Router, uri: &str, user_id: DbId) -> Response {
    send(app, Method::DELETE, uri, user_id, None).await
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read a response body as text.
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Insert a notification row directly, returning its id.
pub async fn seed_notification(
    pool: &PgPool,
    user_id: DbId,
    message: &str,
    kind: Option<&str>,
) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO notifications (user_id, message, kind) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(message)
    .bind(kind)
    .fetch_one(pool)
    .await
    .unwrap()
}
