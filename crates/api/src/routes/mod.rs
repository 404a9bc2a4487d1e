pub mod health;
pub mod pipeline;
pub mod processing;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                      WebSocket (token via query param)
///
/// /processing/sessions                     start (POST)
/// /processing/sessions/latest              latest session (GET)
/// /processing/sessions/{id}/progress       report progress (PATCH)
/// /processing/sessions/{id}/complete       complete (POST)
/// /processing/sessions/{id}/fail           fail (POST)
///
/// /pipeline                                list started pipelines (GET)
/// /pipeline/{pillar}                       get (GET), advance step (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/processing", processing::router())
        .nest("/pipeline", pipeline::router())
}
