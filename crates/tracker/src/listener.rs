//! Live-update listener: feeds pushed change notifications into the cache.
//!
//! One subscription exists per authenticated user. The subscription is a
//! scoped resource: dropping the returned [`LiveSubscription`] aborts the
//! listening task, so release is guaranteed on every exit path, including
//! abrupt teardown.

use std::sync::Arc;

use pillars_core::session_events::{
    MSG_TYPE_PIPELINE_PROGRESS, MSG_TYPE_SESSION_COMPLETED, MSG_TYPE_SESSION_FAILED,
    MSG_TYPE_SESSION_PROGRESS, MSG_TYPE_SESSION_STARTED,
};
use pillars_core::types::DbId;
use pillars_db::models::pipeline_progress::PipelineProgress;
use pillars_db::models::processing_session::ProcessingSession;
use pillars_events::{EventBus, TrackerEvent};
use tokio::sync::broadcast;

use crate::cache::TrackerCache;

/// Handle to an active live-update subscription.
///
/// Dropping the handle aborts the listening task.
pub struct LiveSubscription {
    task: tokio::task::JoinHandle<()>,
}

impl LiveSubscription {
    /// Whether the listening task is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Subscribes to tracker change notifications for one user.
pub struct LiveUpdateListener;

impl LiveUpdateListener {
    /// Start listening for `user_id`'s change notifications, applying each
    /// one to `cache`.
    ///
    /// Application is last-write-wins by freshness: the cache drops any
    /// pushed row older than its current copy, so a notification delayed in
    /// transit cannot clobber a newer local write.
    pub fn subscribe(cache: Arc<TrackerCache>, bus: &EventBus, user_id: DbId) -> LiveSubscription {
        let receiver = bus.subscribe();
        let task = tokio::spawn(Self::run(cache, receiver, user_id));
        LiveSubscription { task }
    }

    async fn run(
        cache: Arc<TrackerCache>,
        mut receiver: broadcast::Receiver<TrackerEvent>,
        user_id: DbId,
    ) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if event.user_id != user_id {
                        continue;
                    }
                    Self::apply(&cache, &event).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(user_id, skipped = n, "Live update listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!(user_id, "Event bus closed, live listener stopping");
                    break;
                }
            }
        }
    }

    /// Apply one notification to the cache.
    async fn apply(cache: &TrackerCache, event: &TrackerEvent) {
        match event.event_type.as_str() {
            MSG_TYPE_SESSION_STARTED
            | MSG_TYPE_SESSION_PROGRESS
            | MSG_TYPE_SESSION_COMPLETED
            | MSG_TYPE_SESSION_FAILED => {
                match serde_json::from_value::<ProcessingSession>(event.payload.clone()) {
                    Ok(session) => {
                        let applied = cache.put_session(session).await;
                        if !applied {
                            tracing::debug!(seq = event.seq, "Dropped stale session push");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, seq = event.seq, "Malformed session payload");
                    }
                }
            }
            MSG_TYPE_PIPELINE_PROGRESS => {
                match serde_json::from_value::<PipelineProgress>(event.payload.clone()) {
                    Ok(row) => {
                        let applied = cache.put_pipeline(row).await;
                        if !applied {
                            tracing::debug!(seq = event.seq, "Dropped stale pipeline push");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, seq = event.seq, "Malformed pipeline payload");
                    }
                }
            }
            other => {
                tracing::trace!(event_type = other, "Ignoring unrecognized event type");
            }
        }
    }
}
