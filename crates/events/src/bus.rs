//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>` between the engine (publisher)
//! and the persistence/forwarding services (subscribers). Publishing never
//! blocks and never fails; a state transition is never rolled back because
//! a signal could not be handed off.

use chrono::Utc;
use dispatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// OutboundEvent
// ---------------------------------------------------------------------------

/// A signal leaving the dispatch engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEvent {
    /// Dot-separated signal name, e.g. `"dispatch.escalation"`.
    pub event_type: String,

    /// Entity the signal is about (`"attribution"`, `"booking"`).
    pub source_entity_type: Option<String>,

    pub source_entity_id: Option<DbId>,

    /// Signal-specific data.
    pub payload: serde_json::Value,

    pub timestamp: Timestamp,
}

impl OutboundEvent {
    /// Create an event with an empty payload stamped with the current time.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source_entity_type: None,
            source_entity_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, entity_type: impl Into<String>, entity_id: DbId) -> Self {
        self.source_entity_type = Some(entity_type.into());
        self.source_entity_id = Some(entity_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Override the timestamp (the engine stamps signals with its own clock).
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out bus for [`OutboundEvent`]s.
pub struct EventBus {
    sender: broadcast::Sender<OutboundEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently when nobody
    /// listens.
    pub fn publish(&self, event: OutboundEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
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

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(
            OutboundEvent::new("dispatch.escalation")
                .with_source("attribution", 42)
                .with_payload(serde_json::json!({"reason": "no_response"})),
        );

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.event_type, "dispatch.escalation");
        assert_eq!(received.source_entity_type.as_deref(), Some("attribution"));
        assert_eq!(received.source_entity_id, Some(42));
        assert_eq!(received.payload["reason"], "no_response");
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(OutboundEvent::new("notification.intent"));

        assert_eq!(rx1.recv().await.unwrap().event_type, "notification.intent");
        assert_eq!(rx2.recv().await.unwrap().event_type, "notification.intent");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        EventBus::default().publish(OutboundEvent::new("orphan"));
    }
}
