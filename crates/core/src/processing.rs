//! Processing session vocabulary and progress clamping.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Process type
// ---------------------------------------------------------------------------

/// The kinds of asynchronous AI jobs a session can track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    AssessmentAnalysis,
    ActionableGeneration,
    CalendarOptimization,
}

impl ProcessType {
    /// Parse a process type string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "assessment_analysis" => Ok(Self::AssessmentAnalysis),
            "actionable_generation" => Ok(Self::ActionableGeneration),
            "calendar_optimization" => Ok(Self::CalendarOptimization),
            _ => Err(CoreError::Validation(format!(
                "Invalid process type '{s}'. Must be one of: assessment_analysis, \
                 actionable_generation, calendar_optimization"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssessmentAnalysis => "assessment_analysis",
            Self::ActionableGeneration => "actionable_generation",
            Self::CalendarOptimization => "calendar_optimization",
        }
    }
}

// ---------------------------------------------------------------------------
// Session status
// ---------------------------------------------------------------------------

/// Lifecycle status of a processing session.
///
/// Transitions are monotonic: `Started -> Processing -> Completed | Failed`,
/// with `Failed` reachable from any non-terminal status. `Completed` and
/// `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Started,
    Processing,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Parse a status string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "started" => Ok(Self::Started),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(CoreError::Validation(format!(
                "Invalid session status '{s}'. Must be one of: started, processing, \
                 completed, failed"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Whether no further transitions may leave this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

// ---------------------------------------------------------------------------
// Progress clamping
// ---------------------------------------------------------------------------

/// Clamp a progress percentage to the valid `[0, 100]` range.
///
/// Out-of-range input is clamped rather than rejected; availability is
/// preferred over strictness for progress reporting.
pub fn clamp_percent(percent: i16) -> i16 {
    percent.clamp(0, 100)
}

/// Derive the session status implied by a (clamped) progress value.
pub fn status_for_progress(percent: i16) -> SessionStatus {
    if percent >= 100 {
        SessionStatus::Completed
    } else {
        SessionStatus::Processing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_below_zero_to_zero() {
        assert_eq!(clamp_percent(-5), 0);
        assert_eq!(clamp_percent(i16::MIN), 0);
    }

    #[test]
    fn clamps_above_hundred_to_hundred() {
        assert_eq!(clamp_percent(101), 100);
        assert_eq!(clamp_percent(i16::MAX), 100);
    }

    #[test]
    fn leaves_valid_range_untouched() {
        for p in 0..=100 {
            assert_eq!(clamp_percent(p), p);
        }
    }

    #[test]
    fn status_is_completed_only_at_hundred() {
        assert_eq!(status_for_progress(99), SessionStatus::Processing);
        assert_eq!(status_for_progress(100), SessionStatus::Completed);
        assert_eq!(status_for_progress(0), SessionStatus::Processing);
    }

    #[test]
    fn terminal_statuses() {
        assert!(SessionStatus::Completed.is_terminal());
        assert!(SessionStatus::Failed.is_terminal());
        assert!(!SessionStatus::Started.is_terminal());
        assert!(!SessionStatus::Processing.is_terminal());
    }

    #[test]
    fn round_trips_statuses() {
        for s in ["started", "processing", "completed", "failed"] {
            assert_eq!(SessionStatus::from_str_db(s).unwrap().as_str(), s);
        }
        assert!(SessionStatus::from_str_db("cancelled").is_err());
    }
}
