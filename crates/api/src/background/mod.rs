//! Background maintenance tasks.

pub mod session_reaper;
