//! Event type constants for processing session and pipeline updates.
//!
//! Used when publishing tracker events to the bus and when broadcasting
//! live updates to connected WebSocket clients.

/// Progress update for a processing session (percentage + current step).
pub const MSG_TYPE_SESSION_PROGRESS: &str = "session_progress";

/// Processing session completed successfully.
pub const MSG_TYPE_SESSION_COMPLETED: &str = "session_completed";

/// Processing session failed with an error.
pub const MSG_TYPE_SESSION_FAILED: &str = "session_failed";

/// Processing session created.
pub const MSG_TYPE_SESSION_STARTED: &str = "session_started";

/// Pipeline progress advanced for a pillar.
pub const MSG_TYPE_PIPELINE_PROGRESS: &str = "pipeline_progress";
