//! Row models and DTOs for the Pillars tables.

pub mod pipeline_progress;
pub mod processing_session;
