//! Route definitions for the `/processing` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, patch, post};
use axum::Router;

use crate::handlers::processing;
use crate::state::AppState;

/// Routes mounted at `/processing`.
///
/// ```text
/// POST   /sessions                   -> start_session
/// GET    /sessions/latest            -> latest_session
/// PATCH  /sessions/{id}/progress     -> report_progress
/// POST   /sessions/{id}/complete     -> complete_session
/// POST   /sessions/{id}/fail         -> fail_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(processing::start_session))
        .route("/sessions/latest", get(processing::latest_session))
        .route("/sessions/{id}/progress", patch(processing::report_progress))
        .route("/sessions/{id}/complete", post(processing::complete_session))
        .route("/sessions/{id}/fail", post(processing::fail_session))
}
