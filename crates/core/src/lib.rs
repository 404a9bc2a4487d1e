//! Domain types shared across the Pillars backend.
//!
//! Closed vocabularies (pillars, process types, session statuses, pipeline
//! steps) live here as enums with database string mappings, together with
//! the pure pipeline progress calculator and the shared error type.

pub mod error;
pub mod pillar;
pub mod pipeline;
pub mod processing;
pub mod session_events;
pub mod types;
