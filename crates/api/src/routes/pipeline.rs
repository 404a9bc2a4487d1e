//! Route definitions for the `/pipeline` resource.
//!
//! All endpoints require authentication.

use axum::routing::get;
use axum::Router;

use crate::handlers::pipeline;
use crate::state::AppState;

/// Routes mounted at `/pipeline`.
///
/// ```text
/// GET    /              -> list_pipelines
/// GET    /{pillar}      -> get_pipeline
/// PUT    /{pillar}      -> update_pipeline
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pipeline::list_pipelines))
        .route(
            "/{pillar}",
            get(pipeline::get_pipeline).put(pipeline::update_pipeline),
        )
}
