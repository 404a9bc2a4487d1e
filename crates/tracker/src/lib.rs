//! Processing tracker: coordination of AI processing sessions and pillar
//! pipeline progress.
//!
//! - [`ProcessingTracker`] — the single point of coordination for starting,
//!   updating, completing, and failing processing sessions, and for
//!   advancing per-pillar pipeline progress. Every mutation goes to the
//!   database first, refreshes the in-memory cache from the returned row,
//!   and publishes a change event on the bus.
//! - [`TrackerCache`] — the in-memory view consumed by presentation code,
//!   guarded against stale overwrites.
//! - [`LiveUpdateListener`] — scoped subscription that feeds pushed change
//!   notifications back into the cache.

pub mod cache;
pub mod error;
pub mod listener;
pub mod tracker;

pub use cache::TrackerCache;
pub use error::TrackerError;
pub use listener::{LiveSubscription, LiveUpdateListener};
pub use tracker::ProcessingTracker;
