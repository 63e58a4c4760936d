//! The two outbound signal kinds and their event envelopes.

use dispatch_core::attribution::ExpiryReason;
use dispatch_core::types::{DbId, Timestamp};
use dispatch_core::updates::{RecipientType, UpdateType};
use serde::Serialize;

use crate::bus::OutboundEvent;

/// Event type for [`NotificationIntent`].
pub const NOTIFICATION_INTENT: &str = "notification.intent";

/// Event type for [`EscalationSignal`].
pub const DISPATCH_ESCALATION: &str = "dispatch.escalation";

/// "Tell this recipient about this": handed to the messaging subsystem,
/// which picks the transport. Delivery outcome is never observed here.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationIntent {
    pub recipient_type: RecipientType,
    pub recipient_id: DbId,
    pub kind: UpdateType,
    pub attribution_id: DbId,
    pub payload: serde_json::Value,
}

impl NotificationIntent {
    pub fn to_event(&self, now: Timestamp) -> OutboundEvent {
        OutboundEvent::new(NOTIFICATION_INTENT)
            .with_source("attribution", self.attribution_id)
            .with_payload(serde_json::json!({
                "recipient_type": self.recipient_type,
                "recipient_id": self.recipient_id,
                "kind": self.kind,
                "payload": self.payload,
            }))
            .at(now)
    }
}

/// An attribution expired unfilled; operations staff should intervene.
#[derive(Debug, Clone, Serialize)]
pub struct EscalationSignal {
    pub booking_id: DbId,
    pub attribution_id: DbId,
    pub generation: i32,
    pub reason: ExpiryReason,
    pub broadcast_count: i32,
    pub max_distance_km: f64,
}

impl EscalationSignal {
    pub fn to_event(&self, now: Timestamp) -> OutboundEvent {
        OutboundEvent::new(DISPATCH_ESCALATION)
            .with_source("booking", self.booking_id)
            .with_payload(serde_json::json!({
                "booking_id": self.booking_id,
                "attribution_id": self.attribution_id,
                "generation": self.generation,
                "reason": self.reason,
                "broadcast_count": self.broadcast_count,
                "max_distance_km": self.max_distance_km,
            }))
            .at(now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn intent_event_carries_recipient_and_kind() {
        let intent = NotificationIntent {
            recipient_type: RecipientType::Professional,
            recipient_id: 7,
            kind: UpdateType::NewOpportunity,
            attribution_id: 3,
            payload: serde_json::json!({"distance_km": 4.2}),
        };
        let event = intent.to_event(Utc::now());
        assert_eq!(event.event_type, NOTIFICATION_INTENT);
        assert_eq!(event.source_entity_id, Some(3));
        assert_eq!(event.payload["recipient_type"], "professional");
        assert_eq!(event.payload["recipient_id"], 7);
        assert_eq!(event.payload["kind"], "new_opportunity");
        assert_eq!(event.payload["payload"]["distance_km"], 4.2);
    }

    #[test]
    fn escalation_event_is_keyed_by_booking() {
        let signal = EscalationSignal {
            booking_id: 11,
            attribution_id: 5,
            generation: 2,
            reason: ExpiryReason::AllDeclined,
            broadcast_count: 3,
            max_distance_km: 45.0,
        };
        let event = signal.to_event(Utc::now());
        assert_eq!(event.event_type, DISPATCH_ESCALATION);
        assert_eq!(event.source_entity_type.as_deref(), Some("booking"));
        assert_eq!(event.source_entity_id, Some(11));
        assert_eq!(event.payload["reason"], "all_declined");
    }
}
