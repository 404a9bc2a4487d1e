//! Handlers for the `/processing/sessions` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. A user can only
//! touch their own sessions; admins may touch any.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use pillars_core::error::CoreError;
use pillars_core::types::DbId;
use pillars_db::models::processing_session::{
    CompleteSession, FailSession, ProcessingSession, ReportProgress, StartSession,
};
use pillars_db::repositories::ProcessingSessionRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Role allowed to act on any user's sessions.
const ROLE_ADMIN: &str = "admin";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a session by ID and verify the caller owns it (or is admin).
///
/// Returns `NotFound` if the session does not exist, `Forbidden` if the
/// caller is not the owner and is not an admin. `action` is used in the
/// error message (e.g. "update", "complete", "fail").
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    session_id: DbId,
    auth: &AuthUser,
    action: &str,
) -> AppResult<ProcessingSession> {
    let session = ProcessingSessionRepo::find_by_id(pool, session_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ProcessingSession",
            id: session_id,
        }))?;

    if session.user_id != auth.user_id && auth.role != ROLE_ADMIN {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another user's processing session"
        ))));
    }

    Ok(session)
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

/// POST /api/v1/processing/sessions
///
/// Start a new processing session for the caller. Returns 201 with the
/// created session; the actual AI work is picked up asynchronously by the
/// worker, and progress arrives via the WebSocket stream.
pub async fn start_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<StartSession>,
) -> AppResult<impl IntoResponse> {
    let session = state
        .tracker
        .start_processing_session(Some(auth.user_id), &input)
        .await?;

    tracing::info!(
        session_id = session.id,
        process_type = %session.process_type,
        user_id = auth.user_id,
        "Processing session started via API",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: session })))
}

// ---------------------------------------------------------------------------
// Latest
// ---------------------------------------------------------------------------

/// GET /api/v1/processing/sessions/latest
///
/// The caller's most recently started session, or `null` if none exists.
pub async fn latest_session(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let session = state.tracker.latest_session(Some(auth.user_id)).await?;
    Ok(Json(DataResponse { data: session }))
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// PATCH /api/v1/processing/sessions/{id}/progress
///
/// Report progress on a session. Progress is clamped to [0, 100]; reaching
/// 100 completes the session.
pub async fn report_progress(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Json(input): Json<ReportProgress>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, session_id, &auth, "update").await?;

    let session = state
        .tracker
        .update_progress(
            session_id,
            input.progress,
            input.current_step.as_deref(),
            input.metadata.as_ref(),
        )
        .await?;

    Ok(Json(DataResponse { data: session }))
}

// ---------------------------------------------------------------------------
// Complete
// ---------------------------------------------------------------------------

/// POST /api/v1/processing/sessions/{id}/complete
///
/// Force-complete a session, merging `results` into its metadata.
pub async fn complete_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Json(input): Json<CompleteSession>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, session_id, &auth, "complete").await?;

    let session = state
        .tracker
        .complete_session(session_id, input.results.as_ref())
        .await?;

    Ok(Json(DataResponse { data: session }))
}

// ---------------------------------------------------------------------------
// Fail
// ---------------------------------------------------------------------------

/// POST /api/v1/processing/sessions/{id}/fail
///
/// Mark a session as failed. Partial progress is preserved for diagnostics.
pub async fn fail_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    Json(input): Json<FailSession>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(&state.pool, session_id, &auth, "fail").await?;

    let session = state
        .tracker
        .fail_session(session_id, &input.error_details)
        .await?;

    Ok(Json(DataResponse { data: session }))
}
