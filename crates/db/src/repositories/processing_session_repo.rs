//! Repository for the `processing_sessions` table.
//!
//! Status strings come from `SessionStatus` in `pillars-core`; no literal
//! appears here that is not backed by the enum.

use pillars_core::processing::{ProcessType, SessionStatus};
use pillars_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::processing_session::ProcessingSession;

/// Column list for `processing_sessions` queries.
const COLUMNS: &str = "\
    id, user_id, process_type, pillar_type, status, \
    progress_percentage, current_step, estimated_completion_time, \
    processing_metadata, error_details, \
    started_at, completed_at, created_at, updated_at";

/// Provides CRUD operations for processing sessions.
pub struct ProcessingSessionRepo;

impl ProcessingSessionRepo {
    /// Create a new session in `started` status with seeded metadata.
    pub async fn create(
        pool: &PgPool,
        user_id: DbId,
        process_type: ProcessType,
        pillar_type: Option<&str>,
        metadata: &serde_json::Value,
    ) -> Result<ProcessingSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO processing_sessions \
                 (user_id, process_type, pillar_type, status, processing_metadata) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProcessingSession>(&query)
            .bind(user_id)
            .bind(process_type.as_str())
            .bind(pillar_type)
            .bind(SessionStatus::Started.as_str())
            .bind(metadata)
            .fetch_one(pool)
            .await
    }

    /// Update progress, current step, and status in one write.
    ///
    /// `completed_at` is set exactly once, when the status first becomes
    /// terminal. Metadata, when provided, is merged non-destructively
    /// (existing keys not present in the patch are preserved).
    ///
    /// Terminal sessions are never touched: `completed_at IS NULL` holds
    /// exactly for non-terminal rows, so the write matches nothing and
    /// `Ok(None)` is returned once a session has completed or failed.
    pub async fn update_progress(
        pool: &PgPool,
        session_id: DbId,
        percent: i16,
        status: SessionStatus,
        current_step: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<Option<ProcessingSession>, sqlx::Error> {
        let query = format!(
            "UPDATE processing_sessions \
             SET progress_percentage = $2, \
                 status = $3, \
                 current_step = COALESCE($4, current_step), \
                 processing_metadata = processing_metadata || COALESCE($5, '{{}}'::jsonb), \
                 completed_at = CASE \
                     WHEN $3 IN ('completed', 'failed') THEN NOW() \
                     ELSE NULL END, \
                 updated_at = NOW() \
             WHERE id = $1 AND completed_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProcessingSession>(&query)
            .bind(session_id)
            .bind(percent)
            .bind(status.as_str())
            .bind(current_step)
            .bind(metadata)
            .fetch_optional(pool)
            .await
    }

    /// Mark a session completed with 100% progress, merging `results` into
    /// the existing metadata.
    ///
    /// Returns `Ok(None)` if the session is already terminal.
    pub async fn complete(
        pool: &PgPool,
        session_id: DbId,
        results: Option<&serde_json::Value>,
    ) -> Result<Option<ProcessingSession>, sqlx::Error> {
        let query = format!(
            "UPDATE processing_sessions \
             SET status = $2, \
                 progress_percentage = 100, \
                 processing_metadata = processing_metadata || COALESCE($3, '{{}}'::jsonb), \
                 completed_at = NOW(), \
                 updated_at = NOW() \
             WHERE id = $1 AND completed_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProcessingSession>(&query)
            .bind(session_id)
            .bind(SessionStatus::Completed.as_str())
            .bind(results)
            .fetch_optional(pool)
            .await
    }

    /// Mark a session failed.
    ///
    /// `progress_percentage` is deliberately left untouched so partial
    /// progress stays visible for diagnostics. Returns `Ok(None)` if the
    /// session is already terminal; in particular a completed session can
    /// never be flipped to failed.
    pub async fn fail(
        pool: &PgPool,
        session_id: DbId,
        error_details: &str,
    ) -> Result<Option<ProcessingSession>, sqlx::Error> {
        let query = format!(
            "UPDATE processing_sessions \
             SET status = $2, \
                 error_details = $3, \
                 completed_at = NOW(), \
                 updated_at = NOW() \
             WHERE id = $1 AND completed_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProcessingSession>(&query)
            .bind(session_id)
            .bind(SessionStatus::Failed.as_str())
            .bind(error_details)
            .fetch_optional(pool)
            .await
    }

    /// Find a session by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ProcessingSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM processing_sessions WHERE id = $1");
        sqlx::query_as::<_, ProcessingSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The user's most recently started session, if any.
    pub async fn latest_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<ProcessingSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM processing_sessions \
             WHERE user_id = $1 \
             ORDER BY started_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, ProcessingSession>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim the oldest unclaimed `started` session of the given
    /// process type and move it to `processing`.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so multiple worker instances
    /// never double-claim a session.
    pub async fn claim_next_started(
        pool: &PgPool,
        process_type: ProcessType,
    ) -> Result<Option<ProcessingSession>, sqlx::Error> {
        let query = format!(
            "UPDATE processing_sessions \
             SET status = $1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM processing_sessions \
                 WHERE status = $2 AND process_type = $3 \
                 ORDER BY started_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProcessingSession>(&query)
            .bind(SessionStatus::Processing.as_str())
            .bind(SessionStatus::Started.as_str())
            .bind(process_type.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Fail every non-terminal session with no update since `cutoff`.
    ///
    /// Returns the reaped rows so callers can publish failure events.
    pub async fn reap_stale(
        pool: &PgPool,
        cutoff: Timestamp,
        error_details: &str,
    ) -> Result<Vec<ProcessingSession>, sqlx::Error> {
        let query = format!(
            "UPDATE processing_sessions \
             SET status = $1, \
                 error_details = $2, \
                 completed_at = COALESCE(completed_at, NOW()), \
                 updated_at = NOW() \
             WHERE status IN ($3, $4) AND updated_at < $5 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProcessingSession>(&query)
            .bind(SessionStatus::Failed.as_str())
            .bind(error_details)
            .bind(SessionStatus::Started.as_str())
            .bind(SessionStatus::Processing.as_str())
            .bind(cutoff)
            .fetch_all(pool)
            .await
    }
}
