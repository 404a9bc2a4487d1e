//! Integration tests for the live-update listener.
//!
//! These drive a `TrackerCache` through the event bus the way the running
//! system does, without a database: the listener consumes published
//! `TrackerEvent`s and applies them to the cache with the freshness guard.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pillars_core::session_events::{MSG_TYPE_PIPELINE_PROGRESS, MSG_TYPE_SESSION_PROGRESS};
use pillars_db::models::pipeline_progress::PipelineProgress;
use pillars_db::models::processing_session::ProcessingSession;
use pillars_events::{EventBus, TrackerEvent};
use pillars_tracker::{LiveUpdateListener, TrackerCache};

fn session(id: i64, user_id: i64, progress: i16, updated_offset_secs: i64) -> ProcessingSession {
    let now = Utc::now();
    ProcessingSession {
        id,
        user_id,
        process_type: "assessment_analysis".into(),
        pillar_type: Some("self_care".into()),
        status: "processing".into(),
        progress_percentage: progress,
        current_step: None,
        estimated_completion_time: None,
        processing_metadata: serde_json::json!({}),
        error_details: None,
        started_at: now - chrono::Duration::seconds(300),
        completed_at: None,
        created_at: now - chrono::Duration::seconds(300),
        updated_at: now + chrono::Duration::seconds(updated_offset_secs),
    }
}

/// Poll the cache until `predicate` holds or the deadline passes.
async fn wait_for<F>(cache: &TrackerCache, predicate: F) -> bool
where
    F: Fn(Option<ProcessingSession>) -> bool,
{
    for _ in 0..100 {
        if predicate(cache.current_session().await) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

// ---------------------------------------------------------------------------
// Test: pushed updates for the subscribed user land in the cache
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pushed_update_reaches_cache() {
    let cache = Arc::new(TrackerCache::new());
    let bus = EventBus::default();
    let _sub = LiveUpdateListener::subscribe(Arc::clone(&cache), &bus, 1);

    bus.publish(
        TrackerEvent::new(MSG_TYPE_SESSION_PROGRESS, 1)
            .with_payload(serde_json::to_value(session(10, 1, 45, 0)).unwrap()),
    );

    assert!(
        wait_for(&cache, |s| s.is_some_and(|s| s.progress_percentage == 45)).await,
        "pushed update never reached the cache"
    );
}

// ---------------------------------------------------------------------------
// Test: another user's events are filtered out
// ---------------------------------------------------------------------------

#[tokio::test]
async fn foreign_user_events_are_ignored() {
    let cache = Arc::new(TrackerCache::new());
    let bus = EventBus::default();
    let _sub = LiveUpdateListener::subscribe(Arc::clone(&cache), &bus, 1);

    bus.publish(
        TrackerEvent::new(MSG_TYPE_SESSION_PROGRESS, 2)
            .with_payload(serde_json::to_value(session(10, 2, 45, 0)).unwrap()),
    );

    // Give the listener time to (not) apply it.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(cache.current_session().await.is_none());
}

// ---------------------------------------------------------------------------
// Test: a later-arriving fresher push overrides the local cache
// ---------------------------------------------------------------------------

#[tokio::test]
async fn live_update_overrides_local_cache() {
    let cache = Arc::new(TrackerCache::new());
    let bus = EventBus::default();
    let _sub = LiveUpdateListener::subscribe(Arc::clone(&cache), &bus, 1);

    // Simulate a local optimistic write.
    cache.put_session(session(10, 1, 30, 0)).await;

    // A fresher push for the same session arrives afterwards.
    bus.publish(
        TrackerEvent::new(MSG_TYPE_SESSION_PROGRESS, 1)
            .with_payload(serde_json::to_value(session(10, 1, 60, 5)).unwrap()),
    );

    assert!(
        wait_for(&cache, |s| s.is_some_and(|s| s.progress_percentage == 60)).await,
        "fresher push should replace the cached value"
    );
}

// ---------------------------------------------------------------------------
// Test: a stale push does not clobber a newer local write
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stale_push_does_not_clobber_newer_write() {
    let cache = Arc::new(TrackerCache::new());
    let bus = EventBus::default();
    let _sub = LiveUpdateListener::subscribe(Arc::clone(&cache), &bus, 1);

    cache.put_session(session(10, 1, 60, 10)).await;

    // A push delayed in transit carries older state.
    bus.publish(
        TrackerEvent::new(MSG_TYPE_SESSION_PROGRESS, 1)
            .with_payload(serde_json::to_value(session(10, 1, 30, 0)).unwrap()),
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        cache.current_session().await.unwrap().progress_percentage,
        60
    );
}

// ---------------------------------------------------------------------------
// Test: pipeline pushes are applied per pillar
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pipeline_push_reaches_cache() {
    let cache = Arc::new(TrackerCache::new());
    let bus = EventBus::default();
    let _sub = LiveUpdateListener::subscribe(Arc::clone(&cache), &bus, 1);

    let now = Utc::now();
    let row = PipelineProgress {
        id: 3,
        user_id: 1,
        pillar_type: "talent".into(),
        current_step: "ai_processing".into(),
        step_progress_percentage: 50,
        total_progress_percentage: 35,
        step_data: serde_json::json!({}),
        completion_timestamps: serde_json::json!({}),
        started_at: now,
        last_activity_at: now,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };
    bus.publish(
        TrackerEvent::new(MSG_TYPE_PIPELINE_PROGRESS, 1)
            .with_payload(serde_json::to_value(&row).unwrap()),
    );

    let mut found = false;
    for _ in 0..100 {
        if let Some(p) = cache.pipeline(pillars_core::pillar::PillarType::Talent).await {
            assert_eq!(p.total_progress_percentage, 35);
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(found, "pipeline push never reached the cache");
}

// ---------------------------------------------------------------------------
// Test: subscribing through the tracker feeds the tracker's own cache
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tracker_subscription_feeds_tracker_cache() {
    let pool = sqlx::PgPool::connect_lazy("postgres://live-test@localhost/unreachable")
        .expect("Lazy pool construction should not connect");
    let bus = Arc::new(EventBus::default());
    let tracker = pillars_tracker::ProcessingTracker::new(pool, Arc::clone(&bus));

    let _sub = tracker.subscribe_live_updates(1);

    bus.publish(
        TrackerEvent::new(MSG_TYPE_SESSION_PROGRESS, 1)
            .with_payload(serde_json::to_value(session(10, 1, 45, 0)).unwrap()),
    );

    let cache = tracker.cache();
    assert!(
        wait_for(&cache, |s| s.is_some_and(|s| s.progress_percentage == 45)).await,
        "pushed update never reached the tracker's cache"
    );
}

// ---------------------------------------------------------------------------
// Test: dropping the subscription stops the listener task
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropping_subscription_stops_listener() {
    let cache = Arc::new(TrackerCache::new());
    let bus = EventBus::default();

    let sub = LiveUpdateListener::subscribe(Arc::clone(&cache), &bus, 1);
    assert!(sub.is_active());
    drop(sub);

    // After the drop, pushes must no longer be applied.
    tokio::time::sleep(Duration::from_millis(20)).await;
    bus.publish(
        TrackerEvent::new(MSG_TYPE_SESSION_PROGRESS, 1)
            .with_payload(serde_json::to_value(session(10, 1, 45, 0)).unwrap()),
    );
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(cache.current_session().await.is_none());
}
