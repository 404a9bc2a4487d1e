//! The processing tracker: single point of coordination for session and
//! pipeline mutations.
//!
//! Every mutation follows the same shape: write through the repository,
//! refresh the in-memory cache from the row the database returned (never
//! from the inputs, so server-assigned fields are picked up), then publish
//! a change event on the bus.

use std::sync::Arc;

use chrono::Utc;
use pillars_core::error::CoreError;
use pillars_core::pillar::PillarType;
use pillars_core::pipeline::{self, PipelineStep};
use pillars_core::processing::{clamp_percent, status_for_progress, SessionStatus};
use pillars_core::session_events::{
    MSG_TYPE_PIPELINE_PROGRESS, MSG_TYPE_SESSION_COMPLETED, MSG_TYPE_SESSION_FAILED,
    MSG_TYPE_SESSION_PROGRESS, MSG_TYPE_SESSION_STARTED,
};
use pillars_core::types::DbId;
use pillars_db::models::pipeline_progress::{PipelineProgress, UpdatePipelineStep};
use pillars_db::models::processing_session::{ProcessingSession, StartSession};
use pillars_db::repositories::{PipelineProgressRepo, ProcessingSessionRepo};
use pillars_db::DbPool;
use pillars_events::{EventBus, TrackerEvent};

use crate::cache::TrackerCache;
use crate::error::TrackerError;
use crate::listener::{LiveSubscription, LiveUpdateListener};

/// Orchestrates processing sessions and pillar pipeline progress.
///
/// Cheap to share: hold it in an `Arc` and clone that.
pub struct ProcessingTracker {
    pool: DbPool,
    bus: Arc<EventBus>,
    cache: Arc<TrackerCache>,
}

impl ProcessingTracker {
    /// Create a tracker over the given pool and event bus.
    pub fn new(pool: DbPool, bus: Arc<EventBus>) -> Self {
        Self {
            pool,
            bus,
            cache: Arc::new(TrackerCache::new()),
        }
    }

    /// Shared handle to the in-memory cached view.
    pub fn cache(&self) -> Arc<TrackerCache> {
        Arc::clone(&self.cache)
    }

    /// Subscribe this tracker's cache to pushed change notifications for
    /// one user. Dropping the returned handle ends the subscription.
    pub fn subscribe_live_updates(&self, user_id: DbId) -> LiveSubscription {
        LiveUpdateListener::subscribe(self.cache(), &self.bus, user_id)
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// Start a new processing session for `actor`.
    ///
    /// Fails with [`TrackerError::Unauthenticated`] — before any store
    /// write — when no actor is given. The created row becomes the cached
    /// current session.
    pub async fn start_processing_session(
        &self,
        actor: Option<DbId>,
        input: &StartSession,
    ) -> Result<ProcessingSession, TrackerError> {
        let user_id = actor.ok_or(TrackerError::Unauthenticated)?;

        let mut metadata = serde_json::json!({
            "initiated_by": user_id,
            "source": "pillars_tracker",
            "requested_at": Utc::now(),
        });
        if let Some(input_data) = &input.input_data {
            metadata["input_data"] = input_data.clone();
        }

        let session = ProcessingSessionRepo::create(
            &self.pool,
            user_id,
            input.process_type,
            input.pillar_type.map(|p| p.as_str()),
            &metadata,
        )
        .await?;

        tracing::info!(
            session_id = session.id,
            user_id,
            process_type = %session.process_type,
            "Processing session started"
        );

        self.cache.put_session(session.clone()).await;
        self.publish_session(MSG_TYPE_SESSION_STARTED, &session);
        Ok(session)
    }

    /// Report progress on a session.
    ///
    /// `progress` is clamped to `[0, 100]`; the session moves to
    /// `completed` (with `completed_at` set) iff the clamped value reaches
    /// 100, otherwise to `processing`. A session that is already terminal
    /// is rejected with a conflict.
    pub async fn update_progress(
        &self,
        session_id: DbId,
        progress: i16,
        current_step: Option<&str>,
        metadata: Option<&serde_json::Value>,
    ) -> Result<ProcessingSession, TrackerError> {
        let percent = clamp_percent(progress);
        let status = status_for_progress(percent);

        let updated = ProcessingSessionRepo::update_progress(
            &self.pool,
            session_id,
            percent,
            status,
            current_step,
            metadata,
        )
        .await?;
        let session = self.require_open(session_id, updated).await?;

        tracing::debug!(
            session_id,
            percent,
            status = status.as_str(),
            "Session progress updated"
        );

        self.cache.put_session(session.clone()).await;
        let event_type = if status == SessionStatus::Completed {
            MSG_TYPE_SESSION_COMPLETED
        } else {
            MSG_TYPE_SESSION_PROGRESS
        };
        self.publish_session(event_type, &session);
        Ok(session)
    }

    /// Force a session to `completed`, merging `results` into its metadata.
    /// Rejected with a conflict if the session is already terminal.
    pub async fn complete_session(
        &self,
        session_id: DbId,
        results: Option<&serde_json::Value>,
    ) -> Result<ProcessingSession, TrackerError> {
        let updated = ProcessingSessionRepo::complete(&self.pool, session_id, results).await?;
        let session = self.require_open(session_id, updated).await?;

        tracing::info!(session_id, "Processing session completed");

        self.cache.put_session(session.clone()).await;
        self.publish_session(MSG_TYPE_SESSION_COMPLETED, &session);
        Ok(session)
    }

    /// Force a session to `failed`, preserving its partial progress.
    /// Rejected with a conflict if the session is already terminal; a
    /// completed session can never be flipped to failed.
    pub async fn fail_session(
        &self,
        session_id: DbId,
        error_details: &str,
    ) -> Result<ProcessingSession, TrackerError> {
        let updated = ProcessingSessionRepo::fail(&self.pool, session_id, error_details).await?;
        let session = self.require_open(session_id, updated).await?;

        tracing::warn!(session_id, error = error_details, "Processing session failed");

        self.cache.put_session(session.clone()).await;
        self.publish_session(MSG_TYPE_SESSION_FAILED, &session);
        Ok(session)
    }

    /// The actor's most recently started session, if any.
    pub async fn latest_session(
        &self,
        actor: Option<DbId>,
    ) -> Result<Option<ProcessingSession>, TrackerError> {
        let user_id = actor.ok_or(TrackerError::Unauthenticated)?;
        let session = ProcessingSessionRepo::latest_for_user(&self.pool, user_id).await?;
        if let Some(s) = &session {
            self.cache.put_session(s.clone()).await;
        }
        Ok(session)
    }

    // -----------------------------------------------------------------------
    // Pipeline progress
    // -----------------------------------------------------------------------

    /// Advance (or update within) a pillar pipeline step for `actor`.
    ///
    /// Clamps the step-local progress, recomputes the weighted total, and
    /// upserts the `(user, pillar)` record. Backward step transitions are
    /// rejected so total progress never regresses.
    pub async fn update_pipeline_progress(
        &self,
        actor: Option<DbId>,
        pillar: PillarType,
        update: &UpdatePipelineStep,
    ) -> Result<PipelineProgress, TrackerError> {
        let user_id = actor.ok_or(TrackerError::Unauthenticated)?;

        if let Some(existing) =
            PipelineProgressRepo::find_for_pillar(&self.pool, user_id, pillar).await?
        {
            let current = existing.current_step()?;
            pipeline::validate_step_transition(current, update.step)?;
        }

        let step_progress = clamp_percent(update.step_progress);
        let total = pipeline::total_progress(update.step, step_progress);
        let step_data = update
            .step_data
            .clone()
            .unwrap_or_else(|| serde_json::json!({}));

        let row = PipelineProgressRepo::upsert_step(
            &self.pool,
            user_id,
            pillar,
            update.step,
            step_progress,
            total,
            &step_data,
        )
        .await?;

        tracing::info!(
            user_id,
            pillar = pillar.as_str(),
            step = update.step.as_str(),
            step_progress,
            total,
            "Pipeline progress updated"
        );

        self.cache.put_pipeline(row.clone()).await;
        self.bus.publish(
            TrackerEvent::new(MSG_TYPE_PIPELINE_PROGRESS, user_id)
                .with_payload(serde_json::to_value(&row).unwrap_or_default()),
        );
        Ok(row)
    }

    /// Load (and cache) the actor's pipeline record for a pillar.
    ///
    /// `Ok(None)` means the pipeline has not been started — not an error.
    pub async fn load_pipeline_progress(
        &self,
        actor: Option<DbId>,
        pillar: PillarType,
    ) -> Result<Option<PipelineProgress>, TrackerError> {
        let user_id = actor.ok_or(TrackerError::Unauthenticated)?;
        let row = PipelineProgressRepo::find_for_pillar(&self.pool, user_id, pillar).await?;
        if let Some(r) = &row {
            self.cache.put_pipeline(r.clone()).await;
        }
        Ok(row)
    }

    /// Ensure a pipeline step with sub-activity driven by a session:
    /// convenience used by the worker to keep the `ai_processing` step in
    /// lockstep with the session it reflects.
    pub async fn mirror_session_to_pipeline(
        &self,
        session: &ProcessingSession,
        step: PipelineStep,
        step_progress: i16,
    ) -> Result<(), TrackerError> {
        let Some(pillar) = session.pillar_type() else {
            return Ok(());
        };
        let update = UpdatePipelineStep {
            step,
            step_progress,
            step_data: Some(serde_json::json!({ "session_id": session.id })),
        };
        self.update_pipeline_progress(Some(session.user_id), pillar, &update)
            .await?;
        Ok(())
    }

    /// Resolve the outcome of a terminal-guarded session write.
    ///
    /// The repository mutators match only non-terminal rows; `None` means
    /// the session either does not exist or has already reached `completed`
    /// or `failed`. The read-back distinguishes the two so callers get a
    /// `NotFound` or a `Conflict` instead of a silent no-op.
    async fn require_open(
        &self,
        session_id: DbId,
        updated: Option<ProcessingSession>,
    ) -> Result<ProcessingSession, TrackerError> {
        match updated {
            Some(session) => Ok(session),
            None => match ProcessingSessionRepo::find_by_id(&self.pool, session_id).await? {
                Some(existing) => Err(TrackerError::Domain(CoreError::Conflict(format!(
                    "Session {session_id} is already {} and cannot be modified",
                    existing.status
                )))),
                None => Err(TrackerError::NotFound {
                    entity: "ProcessingSession",
                    id: session_id,
                }),
            },
        }
    }

    fn publish_session(&self, event_type: &str, session: &ProcessingSession) {
        self.bus.publish(
            TrackerEvent::new(event_type, session.user_id)
                .with_payload(serde_json::to_value(session).unwrap_or_default()),
        );
    }
}
