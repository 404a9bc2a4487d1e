//! HTTP request handlers, grouped by resource.

pub mod pipeline;
pub mod processing;
