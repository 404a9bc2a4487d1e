//! Assessment analysis worker.
//!
//! - [`ai`] — the LLM chat-completions client behind the [`ai::AiClient`]
//!   trait.
//! - [`runner`] — the claim-and-process loop that drives claimed sessions
//!   through staged progress updates to completion or failure.

pub mod ai;
pub mod runner;

pub use ai::{AiClient, AiClientError, AnalysisRequest, ChatCompletionsClient};
pub use runner::AnalysisRunner;
