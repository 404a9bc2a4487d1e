//! Processing session entity model and DTOs.

use pillars_core::pillar::PillarType;
use pillars_core::processing::{ProcessType, SessionStatus};
use pillars_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `processing_sessions` table.
///
/// `process_type`, `pillar_type`, and `status` are stored as strings; use
/// the typed accessors when branching on them.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProcessingSession {
    pub id: DbId,
    pub user_id: DbId,
    pub process_type: String,
    pub pillar_type: Option<String>,
    pub status: String,
    pub progress_percentage: i16,
    pub current_step: Option<String>,
    pub estimated_completion_time: Option<Timestamp>,
    pub processing_metadata: serde_json::Value,
    pub error_details: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProcessingSession {
    /// Typed view of the `status` column.
    pub fn status(&self) -> Result<SessionStatus, pillars_core::error::CoreError> {
        SessionStatus::from_str_db(&self.status)
    }

    /// Typed view of the `process_type` column.
    pub fn process_type(&self) -> Result<ProcessType, pillars_core::error::CoreError> {
        ProcessType::from_str_db(&self.process_type)
    }

    /// Typed view of the `pillar_type` column, if set.
    pub fn pillar_type(&self) -> Option<PillarType> {
        self.pillar_type
            .as_deref()
            .and_then(|s| PillarType::from_str_db(s).ok())
    }
}

/// DTO for starting a new processing session.
#[derive(Debug, Clone, Deserialize)]
pub struct StartSession {
    pub process_type: ProcessType,
    pub pillar_type: Option<PillarType>,
    /// Caller-supplied input payload, folded into `processing_metadata`.
    pub input_data: Option<serde_json::Value>,
}

/// DTO for reporting progress on a session.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportProgress {
    pub progress: i16,
    pub current_step: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// DTO for completing a session with optional result payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompleteSession {
    pub results: Option<serde_json::Value>,
}

/// DTO for failing a session.
#[derive(Debug, Clone, Deserialize)]
pub struct FailSession {
    pub error_details: String,
}
