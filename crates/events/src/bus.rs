//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans tracker change notifications out to any number of
//! subscribers (the live-update listener, the WebSocket push router). It
//! is designed to be shared via `Arc<EventBus>` across the application.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use pillars_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// TrackerEvent
// ---------------------------------------------------------------------------

/// A change notification for a processing session or pipeline progress row.
///
/// Constructed via [`TrackerEvent::new`] and enriched with
/// [`with_payload`](TrackerEvent::with_payload). The `payload` carries the
/// full updated row so consumers can replace their cached copy without a
/// read-back. `seq` is stamped by the bus at publish time and is strictly
/// increasing per bus, letting consumers discard stale deliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerEvent {
    /// Event name, one of the `MSG_TYPE_*` constants in `pillars-core`.
    pub event_type: String,

    /// The user whose record changed. Events are only delivered to this
    /// user's connections.
    pub user_id: DbId,

    /// Full updated row, serialized as JSON.
    pub payload: serde_json::Value,

    /// Bus-assigned monotonic sequence number (0 until published).
    pub seq: u64,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl TrackerEvent {
    /// Create a new event for a user with an empty payload.
    pub fn new(event_type: impl Into<String>, user_id: DbId) -> Self {
        Self {
            event_type: event_type.into(),
            user_id,
            payload: serde_json::Value::Object(Default::default()),
            seq: 0,
            timestamp: Utc::now(),
        }
    }

    /// Set the JSON payload (the full updated row).
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus with monotonic sequence stamping.
pub struct EventBus {
    sender: broadcast::Sender<TrackerEvent>,
    next_seq: AtomicU64,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            next_seq: AtomicU64::new(1),
        }
    }

    /// Stamp the event with the next sequence number and publish it.
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// the database row remains the durable record.
    pub fn publish(&self, mut event: TrackerEvent) {
        event.seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        // Ignore the SendError — it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pillars_core::session_events::MSG_TYPE_SESSION_PROGRESS;

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        let event = TrackerEvent::new(MSG_TYPE_SESSION_PROGRESS, 42)
            .with_payload(serde_json::json!({"progress_percentage": 30}));

        bus.publish(event);

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, MSG_TYPE_SESSION_PROGRESS);
        assert_eq!(received.user_id, 42);
        assert_eq!(received.payload["progress_percentage"], 30);
    }

    #[tokio::test]
    async fn sequence_numbers_are_strictly_increasing() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(TrackerEvent::new("a", 1));
        bus.publish(TrackerEvent::new("b", 1));
        bus.publish(TrackerEvent::new("c", 1));

        let mut last = 0;
        for _ in 0..3 {
            let event = rx.recv().await.expect("should receive");
            assert!(event.seq > last, "seq {} not above {last}", event.seq);
            last = event.seq;
        }
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(TrackerEvent::new("multi.test", 7));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert_eq!(e1.event_type, "multi.test");
        assert_eq!(e2.event_type, "multi.test");
        assert_eq!(e1.seq, e2.seq);
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        // No subscribers — this must not panic.
        bus.publish(TrackerEvent::new("orphan.event", 1));
    }
}
