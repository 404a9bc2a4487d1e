use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use pillars_api::auth::jwt::{generate_access_token, JwtConfig};
use pillars_api::config::ServerConfig;
use pillars_api::routes;
use pillars_api::state::AppState;
use pillars_api::ws::WsManager;
use pillars_core::types::DbId;
use pillars_tracker::ProcessingTracker;

/// Signing secret shared by test tokens and the test server config.
const TEST_JWT_SECRET: &str = "integration-test-secret";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        session_stale_after_mins: 30,
        ws_heartbeat_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the full application router with middleware, using the given
/// database pool.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same stack (request ID, timeout, tracing, panic recovery)
/// that production uses. The push router and background tasks are not
/// started; handlers publish to the bus and nothing consumes it.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let ws_manager = Arc::new(WsManager::new());
    let event_bus = Arc::new(pillars_events::EventBus::default());
    let tracker = Arc::new(ProcessingTracker::new(pool.clone(), Arc::clone(&event_bus)));

    let state = AppState {
        pool,
        config: Arc::new(config),
        ws_manager,
        tracker,
        event_bus,
    };

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state)
}

/// Issue an access token for a test user.
pub fn auth_token(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt)
        .expect("Failed to generate test token")
}

/// Send an authenticated request with an optional JSON body.
pub async fn send(
    app: &Router,
    method: Method,
    path: &str,
    token: &str,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header(AUTHORIZATION, format!("Bearer {token}"));
    if body.is_some() {
        builder = builder.header(CONTENT_TYPE, "application/json");
    }
    let request = builder
        .body(match body {
            Some(json) => Body::from(json.to_string()),
            None => Body::empty(),
        })
        .expect("Failed to build request");

    app.clone()
        .oneshot(request)
        .await
        .expect("Request should produce a response")
}

/// Send an unauthenticated GET request.
pub async fn get(app: &Router, path: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .expect("Failed to build request");

    app.clone()
        .oneshot(request)
        .await
        .expect("Request should produce a response")
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Response body should be JSON")
}
