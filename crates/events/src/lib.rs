//! In-process event infrastructure for tracker change notifications.
//!
//! - [`EventBus`] — publish/subscribe hub backed by `tokio::sync::broadcast`.
//! - [`TrackerEvent`] — the change-notification envelope carrying the full
//!   updated row plus a bus-assigned monotonic sequence number.

pub mod bus;

pub use bus::{EventBus, TrackerEvent};
