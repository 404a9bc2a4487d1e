//! Repository for the `pipeline_progress` table.
//!
//! The table is keyed by `(user_id, pillar_type)` with upsert semantics:
//! the first step update creates the row, every later one updates it.

use pillars_core::pillar::PillarType;
use pillars_core::pipeline::PipelineStep;
use pillars_core::types::DbId;
use sqlx::PgPool;

use crate::models::pipeline_progress::PipelineProgress;

/// Column list for `pipeline_progress` queries.
const COLUMNS: &str = "\
    id, user_id, pillar_type, current_step, \
    step_progress_percentage, total_progress_percentage, \
    step_data, completion_timestamps, \
    started_at, last_activity_at, completed_at, created_at, updated_at";

/// Provides upsert/read operations for pillar pipeline progress.
pub struct PipelineProgressRepo;

impl PipelineProgressRepo {
    /// Get the progress record for a (user, pillar), if the pipeline has
    /// been started.
    pub async fn find_for_pillar(
        pool: &PgPool,
        user_id: DbId,
        pillar: PillarType,
    ) -> Result<Option<PipelineProgress>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pipeline_progress \
             WHERE user_id = $1 AND pillar_type = $2"
        );
        sqlx::query_as::<_, PipelineProgress>(&query)
            .bind(user_id)
            .bind(pillar.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Insert or update the progress record for a (user, pillar).
    ///
    /// On conflict:
    /// - `step_data` is merged, not replaced;
    /// - `completion_timestamps` gains an entry for the step only if none
    ///   exists yet (first-write-wins per step);
    /// - `completed_at` is set once, when the step is `completed`;
    /// - `last_activity_at` is always bumped.
    ///
    /// `step_progress` and `total_progress` must already be clamped and
    /// computed by the caller (the tracker).
    pub async fn upsert_step(
        pool: &PgPool,
        user_id: DbId,
        pillar: PillarType,
        step: PipelineStep,
        step_progress: i16,
        total_progress: i16,
        step_data: &serde_json::Value,
    ) -> Result<PipelineProgress, sqlx::Error> {
        let query = format!(
            "INSERT INTO pipeline_progress \
                 (user_id, pillar_type, current_step, \
                  step_progress_percentage, total_progress_percentage, \
                  step_data, completion_timestamps, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, \
                     jsonb_build_object($3::text, NOW()), \
                     CASE WHEN $3 = 'completed' THEN NOW() ELSE NULL END) \
             ON CONFLICT (user_id, pillar_type) DO UPDATE SET \
                 current_step = EXCLUDED.current_step, \
                 step_progress_percentage = EXCLUDED.step_progress_percentage, \
                 total_progress_percentage = EXCLUDED.total_progress_percentage, \
                 step_data = pipeline_progress.step_data || EXCLUDED.step_data, \
                 completion_timestamps = CASE \
                     WHEN pipeline_progress.completion_timestamps ? $3::text \
                     THEN pipeline_progress.completion_timestamps \
                     ELSE pipeline_progress.completion_timestamps \
                          || jsonb_build_object($3::text, NOW()) END, \
                 completed_at = CASE \
                     WHEN $3 = 'completed' \
                     THEN COALESCE(pipeline_progress.completed_at, NOW()) \
                     ELSE pipeline_progress.completed_at END, \
                 last_activity_at = NOW(), \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PipelineProgress>(&query)
            .bind(user_id)
            .bind(pillar.as_str())
            .bind(step.as_str())
            .bind(step_progress)
            .bind(total_progress)
            .bind(step_data)
            .fetch_one(pool)
            .await
    }

    /// List all pipeline records for a user, in pillar order.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<PipelineProgress>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM pipeline_progress \
             WHERE user_id = $1 \
             ORDER BY pillar_type"
        );
        sqlx::query_as::<_, PipelineProgress>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }
}
