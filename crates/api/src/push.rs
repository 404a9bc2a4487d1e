//! Event-to-WebSocket push router.
//!
//! [`PushRouter`] subscribes to the tracker event bus and forwards each
//! change notification to the owning user's WebSocket connections. Other
//! users never see the event.

use std::sync::Arc;

use axum::extract::ws::Message;
use pillars_events::TrackerEvent;
use tokio::sync::broadcast;

use crate::ws::WsManager;

/// Routes tracker events to per-user WebSocket connections.
pub struct PushRouter {
    ws_manager: Arc<WsManager>,
}

impl PushRouter {
    /// Create a new router over the given WebSocket manager.
    pub fn new(ws_manager: Arc<WsManager>) -> Self {
        Self { ws_manager }
    }

    /// Run the push loop.
    ///
    /// Subscribes to the event bus via `receiver` and forwards each event.
    /// The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](pillars_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<TrackerEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    self.push(&event).await;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Push router lagged, some updates were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, push router shutting down");
                    break;
                }
            }
        }
    }

    /// Serialize one event and send it to the owning user's connections.
    async fn push(&self, event: &TrackerEvent) {
        let payload = serde_json::json!({
            "type": event.event_type,
            "seq": event.seq,
            "timestamp": event.timestamp,
            "data": event.payload,
        });

        let sent = self
            .ws_manager
            .send_to_user(event.user_id, Message::Text(payload.to_string().into()))
            .await;

        tracing::trace!(
            event_type = %event.event_type,
            user_id = event.user_id,
            connections = sent,
            "Pushed tracker event"
        );
    }
}
