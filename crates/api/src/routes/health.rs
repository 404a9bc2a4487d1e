//! Liveness/readiness endpoint.

use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

/// Routes mounted at the server root (outside `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// GET /health
///
/// Returns 200 with a static payload once the server is up. Database
/// reachability is verified at startup, not per health probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
