//! Stateless repositories over the Pillars tables.

mod pipeline_progress_repo;
mod processing_session_repo;

pub use pipeline_progress_repo::PipelineProgressRepo;
pub use processing_session_repo::ProcessingSessionRepo;
