use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::WsManager;

/// Spawn a background task that pings all connected WebSocket clients
/// every `interval_secs` seconds.
///
/// Idle periods are free: when no connections are registered the tick is
/// skipped without touching the senders. The task runs until aborted via
/// the returned handle during shutdown.
pub fn start_heartbeat(
    ws_manager: Arc<WsManager>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

        loop {
            interval.tick().await;
            let count = ws_manager.connection_count().await;
            if count == 0 {
                continue;
            }
            tracing::debug!(count, "WebSocket heartbeat ping");
            ws_manager.ping_all().await;
        }
    })
}
