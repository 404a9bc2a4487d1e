//! Typed error surface of the tracker boundary.
//!
//! No tracker operation panics or lets an untyped error escape; callers
//! get a `Result` and decide whether to retry, surface, or ignore.

use pillars_core::error::CoreError;
use pillars_core::types::DbId;

/// Errors returned by [`ProcessingTracker`](crate::ProcessingTracker)
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    /// The operation requires an authenticated actor and none was provided.
    /// No store write is performed.
    #[error("No authenticated user")]
    Unauthenticated,

    /// The targeted record does not exist.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// A domain-level error (validation, forbidden transition).
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// The underlying store read/write failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] sqlx::Error),
}
