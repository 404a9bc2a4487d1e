//! Handlers for the `/pipeline` resource.
//!
//! Pipeline progress is strictly per-user: the path names the pillar, the
//! authenticated caller is always the record owner.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use pillars_core::pillar::PillarType;
use pillars_db::models::pipeline_progress::UpdatePipelineStep;
use pillars_db::repositories::PipelineProgressRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Parse a pillar path segment, mapping failure to a 400.
fn parse_pillar(segment: &str) -> AppResult<PillarType> {
    PillarType::from_str_db(segment).map_err(AppError::Core)
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// PUT /api/v1/pipeline/{pillar}
///
/// Advance the caller's pipeline for a pillar, or update progress within
/// the current step. Moving backward is rejected with 400.
pub async fn update_pipeline(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(pillar): Path<String>,
    Json(input): Json<UpdatePipelineStep>,
) -> AppResult<impl IntoResponse> {
    let pillar = parse_pillar(&pillar)?;

    let row = state
        .tracker
        .update_pipeline_progress(Some(auth.user_id), pillar, &input)
        .await?;

    Ok(Json(DataResponse { data: row }))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /api/v1/pipeline/{pillar}
///
/// The caller's pipeline progress for a pillar, or `null` if the pipeline
/// has not been started yet.
pub async fn get_pipeline(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(pillar): Path<String>,
) -> AppResult<impl IntoResponse> {
    let pillar = parse_pillar(&pillar)?;

    let row = state
        .tracker
        .load_pipeline_progress(Some(auth.user_id), pillar)
        .await?;

    Ok(Json(DataResponse { data: row }))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/pipeline
///
/// All of the caller's started pipelines, one row per pillar.
pub async fn list_pipelines(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let rows = PipelineProgressRepo::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: rows }))
}
