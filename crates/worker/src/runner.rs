//! Claim-and-process loop for assessment analysis sessions.
//!
//! Polls for unclaimed `assessment_analysis` sessions, claims one at a
//! time with `FOR UPDATE SKIP LOCKED` (safe with multiple worker
//! instances), and drives it through staged progress updates to
//! completion. All writes go through the tracker so the same cache and
//! event path fires as for API-driven updates.

use std::sync::Arc;
use std::time::Duration;

use pillars_core::pipeline::PipelineStep;
use pillars_core::processing::ProcessType;
use pillars_db::models::processing_session::ProcessingSession;
use pillars_db::repositories::ProcessingSessionRepo;
use pillars_db::DbPool;
use pillars_tracker::{ProcessingTracker, TrackerError};
use tokio_util::sync::CancellationToken;

use crate::ai::{AiClient, AiClientError, AnalysisRequest};

/// Progress checkpoints reported while a session is being analyzed.
/// Completion (100) is reported separately via `complete_session`.
const STAGES: [(&str, i16); 4] = [
    ("parsing_input", 10),
    ("invoking_model", 30),
    ("generating_insights", 70),
    ("finalizing_results", 90),
];

/// How often to poll for unclaimed sessions.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Errors from a single session run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Ai(#[from] AiClientError),
}

/// Claims and processes assessment analysis sessions until cancelled.
pub struct AnalysisRunner {
    pool: DbPool,
    tracker: Arc<ProcessingTracker>,
    ai: Arc<dyn AiClient>,
}

impl AnalysisRunner {
    pub fn new(pool: DbPool, tracker: Arc<ProcessingTracker>, ai: Arc<dyn AiClient>) -> Self {
        Self { pool, tracker, ai }
    }

    /// Run the claim loop until the token is cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            poll_interval_secs = POLL_INTERVAL.as_secs(),
            "Analysis runner started"
        );
        let mut interval = tokio::time::interval(POLL_INTERVAL);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Analysis runner stopping");
                    break;
                }
                _ = interval.tick() => {
                    match ProcessingSessionRepo::claim_next_started(
                        &self.pool,
                        ProcessType::AssessmentAnalysis,
                    )
                    .await
                    {
                        Ok(Some(session)) => self.process(session).await,
                        Ok(None) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to claim session");
                        }
                    }
                }
            }
        }
    }

    /// Process one claimed session. Failures are terminal: the session is
    /// marked failed with the error string and is not retried.
    pub async fn process(&self, session: ProcessingSession) {
        tracing::info!(
            session_id = session.id,
            user_id = session.user_id,
            "Claimed assessment analysis session"
        );

        if let Err(e) = self.analyze(&session).await {
            tracing::error!(session_id = session.id, error = %e, "Analysis failed");
            if let Err(e) = self.tracker.fail_session(session.id, &e.to_string()).await {
                tracing::error!(
                    session_id = session.id,
                    error = %e,
                    "Failed to mark session as failed"
                );
            }
        }
    }

    async fn analyze(&self, session: &ProcessingSession) -> Result<(), RunnerError> {
        self.checkpoint(session, STAGES[0]).await?;
        let request = AnalysisRequest {
            pillar: session.pillar_type.clone(),
            input: session
                .processing_metadata
                .get("input_data")
                .cloned()
                .unwrap_or(serde_json::Value::Null),
        };

        self.checkpoint(session, STAGES[1]).await?;
        let analysis = self.ai.analyze(&request).await?;

        self.checkpoint(session, STAGES[2]).await?;

        self.checkpoint(session, STAGES[3]).await?;
        let results = serde_json::json!({ "analysis": analysis });
        let completed = self
            .tracker
            .complete_session(session.id, Some(&results))
            .await?;
        self.mirror(&completed, 100).await;

        tracing::info!(session_id = session.id, "Assessment analysis completed");
        Ok(())
    }

    /// Report a progress checkpoint and mirror it into the pillar
    /// pipeline's `ai_processing` step.
    async fn checkpoint(
        &self,
        session: &ProcessingSession,
        (step, percent): (&str, i16),
    ) -> Result<(), TrackerError> {
        let updated = self
            .tracker
            .update_progress(session.id, percent, Some(step), None)
            .await?;
        self.mirror(&updated, percent).await;
        Ok(())
    }

    /// Best-effort pipeline mirror. The pillar pipeline may already be
    /// past `ai_processing` (the user re-ran an assessment), in which case
    /// the update is rejected; pipeline state never decides the session's
    /// fate, so the error is logged and dropped.
    async fn mirror(&self, session: &ProcessingSession, step_progress: i16) {
        if let Err(e) = self
            .tracker
            .mirror_session_to_pipeline(session, PipelineStep::AiProcessing, step_progress)
            .await
        {
            tracing::warn!(
                session_id = session.id,
                error = %e,
                "Pipeline mirror skipped"
            );
        }
    }
}
