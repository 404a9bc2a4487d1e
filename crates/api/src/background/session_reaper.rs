//! Periodic reaping of abandoned processing sessions.
//!
//! A session left in `started` or `processing` is normally resolved by a
//! later completion or failure call; when the producer dies mid-flight the
//! row would otherwise sit there forever. This task fails any non-terminal
//! session that has not been updated within the staleness window, and
//! publishes the failure so live clients see it immediately.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pillars_core::session_events::MSG_TYPE_SESSION_FAILED;
use pillars_db::repositories::ProcessingSessionRepo;
use pillars_events::{EventBus, TrackerEvent};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Error string recorded on reaped sessions.
const STALE_ERROR: &str = "processing timed out";

/// How often the reaper scans for stale sessions.
const REAP_INTERVAL: Duration = Duration::from_secs(300); // 5 minutes

/// Run the session reaper loop.
///
/// Fails sessions with no update in the last `stale_after_mins` minutes.
/// Runs until `cancel` is triggered.
pub async fn run(pool: PgPool, bus: Arc<EventBus>, stale_after_mins: i64, cancel: CancellationToken) {
    tracing::info!(
        stale_after_mins,
        interval_secs = REAP_INTERVAL.as_secs(),
        "Session reaper started"
    );

    let mut interval = tokio::time::interval(REAP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session reaper stopping");
                break;
            }
            _ = interval.tick() => {
                let cutoff = Utc::now() - chrono::Duration::minutes(stale_after_mins);
                match ProcessingSessionRepo::reap_stale(&pool, cutoff, STALE_ERROR).await {
                    Ok(reaped) => {
                        if !reaped.is_empty() {
                            tracing::info!(count = reaped.len(), "Reaped stale sessions");
                        }
                        for session in reaped {
                            bus.publish(
                                TrackerEvent::new(MSG_TYPE_SESSION_FAILED, session.user_id)
                                    .with_payload(
                                        serde_json::to_value(&session).unwrap_or_default(),
                                    ),
                            );
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Session reaper: scan failed");
                    }
                }
            }
        }
    }
}
