//! Pillar pipeline steps and the weighted progress calculator.
//!
//! Every pillar pipeline moves through the same fixed, ordered step
//! sequence. Each step carries a weight (the weights sum to 100) and the
//! total pipeline progress is the sum of all prior step weights plus the
//! weighted fraction of the current step.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Pipeline steps
// ---------------------------------------------------------------------------

/// The six steps of a pillar pipeline, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Assessment,
    AiProcessing,
    ResultsPreview,
    ActionablesGeneration,
    CalendarIntegration,
    Completed,
}

/// All pipeline steps, in pipeline order.
pub const ALL_STEPS: [PipelineStep; 6] = [
    PipelineStep::Assessment,
    PipelineStep::AiProcessing,
    PipelineStep::ResultsPreview,
    PipelineStep::ActionablesGeneration,
    PipelineStep::CalendarIntegration,
    PipelineStep::Completed,
];

impl PipelineStep {
    /// Parse a step string from the database.
    pub fn from_str_db(s: &str) -> Result<Self, CoreError> {
        match s {
            "assessment" => Ok(Self::Assessment),
            "ai_processing" => Ok(Self::AiProcessing),
            "results_preview" => Ok(Self::ResultsPreview),
            "actionables_generation" => Ok(Self::ActionablesGeneration),
            "calendar_integration" => Ok(Self::CalendarIntegration),
            "completed" => Ok(Self::Completed),
            _ => Err(CoreError::Validation(format!(
                "Invalid pipeline step '{s}'. Must be one of: assessment, ai_processing, \
                 results_preview, actionables_generation, calendar_integration, completed"
            ))),
        }
    }

    /// Convert to a database-compatible string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assessment => "assessment",
            Self::AiProcessing => "ai_processing",
            Self::ResultsPreview => "results_preview",
            Self::ActionablesGeneration => "actionables_generation",
            Self::CalendarIntegration => "calendar_integration",
            Self::Completed => "completed",
        }
    }

    /// Human-readable label for the step.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Assessment => "Assessment",
            Self::AiProcessing => "AI Processing",
            Self::ResultsPreview => "Results Preview",
            Self::ActionablesGeneration => "Actionables Generation",
            Self::CalendarIntegration => "Calendar Integration",
            Self::Completed => "Completed",
        }
    }

    /// Share of total pipeline progress attributed to fully completing
    /// this step. The weights sum to 100.
    pub fn weight(&self) -> i16 {
        match self {
            Self::Assessment => 20,
            Self::AiProcessing => 30,
            Self::ResultsPreview => 10,
            Self::ActionablesGeneration => 25,
            Self::CalendarIntegration => 10,
            Self::Completed => 5,
        }
    }

    /// Zero-based position of this step in the pipeline.
    pub fn index(&self) -> usize {
        ALL_STEPS.iter().position(|s| s == self).unwrap_or(0)
    }

    /// Sum of the weights of all steps before this one.
    pub fn prior_weight(&self) -> i16 {
        ALL_STEPS[..self.index()].iter().map(|s| s.weight()).sum()
    }

    /// The step after this one, or `None` for the final step.
    pub fn next(&self) -> Option<Self> {
        ALL_STEPS.get(self.index() + 1).copied()
    }
}

// ---------------------------------------------------------------------------
// Progress calculator
// ---------------------------------------------------------------------------

/// Compute total pipeline progress from the current step and step-local
/// progress.
///
/// `step_progress` must already be clamped to `[0, 100]` by the caller.
/// Pure and deterministic; the persisted `total_progress_percentage` is
/// always recomputable through this function.
pub fn total_progress(step: PipelineStep, step_progress: i16) -> i16 {
    let total =
        f64::from(step.prior_weight()) + f64::from(step.weight()) * f64::from(step_progress) / 100.0;
    total.min(100.0).round() as i16
}

/// Validate a pipeline step transition.
///
/// Re-updating the current step and advancing (by any number of steps) are
/// allowed; moving backward is rejected so that total progress never
/// regresses.
pub fn validate_step_transition(
    current: PipelineStep,
    next: PipelineStep,
) -> Result<(), CoreError> {
    if next < current {
        return Err(CoreError::Validation(format!(
            "Cannot move pipeline back from step '{}' to step '{}'",
            current.as_str(),
            next.as_str()
        )));
    }
    Ok(())
}
