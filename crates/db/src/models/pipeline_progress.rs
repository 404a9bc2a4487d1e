//! Pipeline progress entity model and DTOs.

use pillars_core::pillar::PillarType;
use pillars_core::pipeline::PipelineStep;
use pillars_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `pipeline_progress` table.
///
/// At most one row exists per `(user_id, pillar_type)`; writes go through
/// an upsert. `completion_timestamps` maps step name to the timestamp of
/// the first update seen for that step and is append-only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PipelineProgress {
    pub id: DbId,
    pub user_id: DbId,
    pub pillar_type: String,
    pub current_step: String,
    pub step_progress_percentage: i16,
    pub total_progress_percentage: i16,
    pub step_data: serde_json::Value,
    pub completion_timestamps: serde_json::Value,
    pub started_at: Timestamp,
    pub last_activity_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PipelineProgress {
    /// Typed view of the `current_step` column.
    pub fn current_step(&self) -> Result<PipelineStep, pillars_core::error::CoreError> {
        PipelineStep::from_str_db(&self.current_step)
    }

    /// Typed view of the `pillar_type` column.
    pub fn pillar_type(&self) -> Result<PillarType, pillars_core::error::CoreError> {
        PillarType::from_str_db(&self.pillar_type)
    }
}

/// DTO for advancing a pillar pipeline to a step (or updating progress
/// within the current step).
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePipelineStep {
    pub step: PipelineStep,
    pub step_progress: i16,
    pub step_data: Option<serde_json::Value>,
}
