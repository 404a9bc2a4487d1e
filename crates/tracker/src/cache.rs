//! In-memory cached view of tracker state.
//!
//! The cache holds the current processing session and the latest pipeline
//! progress row per pillar. Both local writes (via the tracker) and pushed
//! notifications (via the live-update listener) land here; a freshness
//! guard drops any incoming row older than the cached copy, so a delayed
//! push can never clobber a newer local write.

use std::collections::HashMap;

use pillars_core::pillar::PillarType;
use pillars_db::models::pipeline_progress::PipelineProgress;
use pillars_db::models::processing_session::ProcessingSession;
use tokio::sync::RwLock;

#[derive(Default)]
struct CacheInner {
    session: Option<ProcessingSession>,
    pipelines: HashMap<String, PipelineProgress>,
}

/// Thread-safe cached tracker state; designed to be shared via `Arc`.
#[derive(Default)]
pub struct TrackerCache {
    inner: RwLock<CacheInner>,
}

impl TrackerCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently tracked processing session, if any.
    pub async fn current_session(&self) -> Option<ProcessingSession> {
        self.inner.read().await.session.clone()
    }

    /// The cached pipeline progress for a pillar, if loaded.
    pub async fn pipeline(&self, pillar: PillarType) -> Option<PipelineProgress> {
        self.inner.read().await.pipelines.get(pillar.as_str()).cloned()
    }

    /// Store a session row, unless a fresher copy is already cached.
    ///
    /// Returns `true` if the row was applied, `false` if it was dropped as
    /// stale. A row for a different session id replaces the cached one only
    /// if it is not older — the newest-started session is the current one.
    pub async fn put_session(&self, session: ProcessingSession) -> bool {
        let mut inner = self.inner.write().await;
        if let Some(cached) = &inner.session {
            let fresher = if cached.id == session.id {
                session.updated_at >= cached.updated_at
            } else {
                session.started_at >= cached.started_at
            };
            if !fresher {
                return false;
            }
        }
        inner.session = Some(session);
        true
    }

    /// Store a pipeline progress row, unless a fresher copy is cached.
    ///
    /// Returns `true` if the row was applied, `false` if dropped as stale.
    pub async fn put_pipeline(&self, row: PipelineProgress) -> bool {
        let mut inner = self.inner.write().await;
        if let Some(cached) = inner.pipelines.get(&row.pillar_type) {
            if row.updated_at < cached.updated_at {
                return false;
            }
        }
        inner.pipelines.insert(row.pillar_type.clone(), row);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pillars_core::processing::SessionStatus;

    fn session(id: i64, progress: i16, age_secs: i64) -> ProcessingSession {
        let now = Utc::now();
        ProcessingSession {
            id,
            user_id: 1,
            process_type: "assessment_analysis".into(),
            pillar_type: Some("self_care".into()),
            status: SessionStatus::Processing.as_str().into(),
            progress_percentage: progress,
            current_step: None,
            estimated_completion_time: None,
            processing_metadata: serde_json::json!({}),
            error_details: None,
            started_at: now - Duration::seconds(600),
            completed_at: None,
            created_at: now - Duration::seconds(600),
            updated_at: now - Duration::seconds(age_secs),
        }
    }

    #[tokio::test]
    async fn empty_cache_accepts_any_session() {
        let cache = TrackerCache::new();
        assert!(cache.put_session(session(1, 10, 0)).await);
        assert_eq!(cache.current_session().await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn newer_push_overrides_local_value() {
        let cache = TrackerCache::new();
        // Local write at t-10s, pushed notification at t-0s.
        cache.put_session(session(1, 30, 10)).await;
        assert!(cache.put_session(session(1, 60, 0)).await);
        assert_eq!(
            cache.current_session().await.unwrap().progress_percentage,
            60
        );
    }

    #[tokio::test]
    async fn stale_push_is_dropped() {
        let cache = TrackerCache::new();
        cache.put_session(session(1, 60, 0)).await;
        // A delayed notification carrying older state must not win.
        assert!(!cache.put_session(session(1, 30, 10)).await);
        assert_eq!(
            cache.current_session().await.unwrap().progress_percentage,
            60
        );
    }

    #[tokio::test]
    async fn pipelines_are_cached_per_pillar() {
        let cache = TrackerCache::new();
        let now = Utc::now();
        let row = PipelineProgress {
            id: 1,
            user_id: 1,
            pillar_type: "skills".into(),
            current_step: "assessment".into(),
            step_progress_percentage: 40,
            total_progress_percentage: 8,
            step_data: serde_json::json!({}),
            completion_timestamps: serde_json::json!({}),
            started_at: now,
            last_activity_at: now,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        assert!(cache.put_pipeline(row).await);
        assert!(cache.pipeline(PillarType::Skills).await.is_some());
        assert!(cache.pipeline(PillarType::Brand).await.is_none());
    }
}
