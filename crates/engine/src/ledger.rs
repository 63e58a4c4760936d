//! Update/Outbox Ledger.
//!
//! [`FanOut`] collects the outbox rows and outbound signals a transition
//! produces; it is written inside the transition's transaction and published
//! after commit. [`UpdateLedger`] is the pull side: poll, acknowledge, reap.

use dispatch_core::attribution::ExpiryReason;
use dispatch_core::config::DispatchConfig;
use dispatch_core::error::CoreError;
use dispatch_core::types::{DbId, Timestamp};
use dispatch_core::updates::{clamp_poll_limit, RecipientType, UpdateType, MAX_ACK_BATCH};
use dispatch_db::models::attribution::Attribution;
use dispatch_db::models::update::{NewUpdate, PolledUpdate};
use dispatch_db::repositories::{AttributionRepo, UpdateRepo};
use dispatch_events::{EscalationSignal, EventBus, NotificationIntent};
use sqlx::PgConnection;

use crate::error::EngineResult;
use crate::EngineContext;

// ---------------------------------------------------------------------------
// FanOut
// ---------------------------------------------------------------------------

/// Side effects of one state transition, pending commit.
#[derive(Debug)]
pub(crate) struct FanOut {
    now: Timestamp,
    expires_at: Timestamp,
    updates: Vec<NewUpdate>,
    escalations: Vec<EscalationSignal>,
}

impl FanOut {
    pub(crate) fn new(now: Timestamp, config: &DispatchConfig) -> Self {
        Self {
            now,
            expires_at: now + config.update_ttl(),
            updates: Vec::new(),
            escalations: Vec::new(),
        }
    }

    /// Queue one outbox row (and its notification intent).
    pub(crate) fn notify(
        &mut self,
        attribution_id: DbId,
        recipient_type: RecipientType,
        recipient_id: DbId,
        update_type: UpdateType,
        payload: serde_json::Value,
    ) {
        self.updates.push(NewUpdate {
            attribution_id,
            recipient_type,
            recipient_id,
            update_type,
            payload,
            created_at: self.now,
            expires_at: self.expires_at,
        });
    }

    /// Queue a client update when the booking has a known customer.
    pub(crate) fn notify_client(
        &mut self,
        attribution: &Attribution,
        update_type: UpdateType,
        payload: serde_json::Value,
    ) {
        if let Some(customer_id) = attribution.customer_id {
            self.notify(
                attribution.id,
                RecipientType::Client,
                customer_id,
                update_type,
                payload,
            );
        }
    }

    pub(crate) fn escalate(&mut self, signal: EscalationSignal) {
        self.escalations.push(signal);
    }

    pub(crate) fn update_count(&self) -> usize {
        self.updates.len()
    }

    /// Insert the queued outbox rows on the caller's connection.
    pub(crate) async fn write(&self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        for update in &self.updates {
            UpdateRepo::insert(&mut *conn, update).await?;
        }
        Ok(())
    }

    /// Hand the signals to the bus. Call only after commit.
    pub(crate) fn publish(self, bus: &EventBus) {
        for update in self.updates {
            let intent = NotificationIntent {
                recipient_type: update.recipient_type,
                recipient_id: update.recipient_id,
                kind: update.update_type,
                attribution_id: update.attribution_id,
                payload: update.payload,
            };
            bus.publish(intent.to_event(self.now));
        }
        for signal in self.escalations {
            bus.publish(signal.to_event(self.now));
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// JSON payloads carried by each update type.
pub(crate) mod payload {
    use super::*;

    /// `new_opportunity` / `rebroadcast`: everything a professional needs to
    /// decide.
    pub(crate) fn opportunity(attribution: &Attribution, distance_km: f64) -> serde_json::Value {
        serde_json::json!({
            "attribution_id": attribution.id,
            "booking_id": attribution.booking_id,
            "service_category": attribution.service_category,
            "location": { "lat": attribution.service_lat, "lng": attribution.service_lng },
            "scheduled_at": attribution.scheduled_at,
            "amount_cents": attribution.amount_cents,
            "distance_km": distance_km,
            "broadcast_count": attribution.broadcast_count,
            "max_distance_km": attribution.max_distance_km,
        })
    }

    pub(crate) fn job_taken(attribution: &Attribution) -> serde_json::Value {
        serde_json::json!({
            "attribution_id": attribution.id,
            "booking_id": attribution.booking_id,
        })
    }

    pub(crate) fn accepted_confirmation(attribution: &Attribution) -> serde_json::Value {
        serde_json::json!({
            "attribution_id": attribution.id,
            "booking_id": attribution.booking_id,
            "service_category": attribution.service_category,
            "location": { "lat": attribution.service_lat, "lng": attribution.service_lng },
            "scheduled_at": attribution.scheduled_at,
            "amount_cents": attribution.amount_cents,
            "accepted_at": attribution.accepted_at,
        })
    }

    pub(crate) fn professional_assigned(attribution: &Attribution) -> serde_json::Value {
        serde_json::json!({
            "attribution_id": attribution.id,
            "booking_id": attribution.booking_id,
            "professional_id": attribution.accepted_professional_id,
            "accepted_at": attribution.accepted_at,
        })
    }

    /// `opportunity_expired` / `dispatch_expired`.
    pub(crate) fn expired(attribution: &Attribution, reason: ExpiryReason) -> serde_json::Value {
        serde_json::json!({
            "attribution_id": attribution.id,
            "booking_id": attribution.booking_id,
            "reason": reason,
        })
    }

    pub(crate) fn assignment_cancelled(
        cancelled: &Attribution,
        next_attribution_id: DbId,
    ) -> serde_json::Value {
        serde_json::json!({
            "attribution_id": cancelled.id,
            "booking_id": cancelled.booking_id,
            "professional_id": cancelled.cancelled_professional_id,
            "next_attribution_id": next_attribution_id,
        })
    }
}

// ---------------------------------------------------------------------------
// UpdateLedger
// ---------------------------------------------------------------------------

/// Parameters of one `pollUpdates` call.
#[derive(Debug, Clone)]
pub struct PollRequest {
    pub recipient_type: RecipientType,
    pub recipient_id: DbId,
    pub since: Option<Timestamp>,
    pub limit: Option<i64>,
}

/// Pull-side operations on the outbox.
#[derive(Clone)]
pub struct UpdateLedger {
    ctx: EngineContext,
}

impl UpdateLedger {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Unacknowledged, unexpired updates for one recipient, oldest first.
    ///
    /// Entries past `expires_at` are never returned, acknowledged or not.
    pub async fn poll(&self, request: &PollRequest, now: Timestamp) -> EngineResult<Vec<PolledUpdate>> {
        if request.recipient_id <= 0 {
            return Err(CoreError::Validation("recipient_id must be positive".into()).into());
        }
        let entries = UpdateRepo::poll(
            &self.ctx.pool,
            request.recipient_type,
            request.recipient_id,
            request.since,
            clamp_poll_limit(request.limit),
            now,
        )
        .await?;
        Ok(entries.into_iter().map(PolledUpdate::from).collect())
    }

    /// Mark updates as acknowledged. Idempotent; unknown ids are ignored.
    ///
    /// Returns how many rows this call newly acknowledged.
    pub async fn acknowledge(
        &self,
        ids: &[DbId],
        recipient: Option<(RecipientType, DbId)>,
        now: Timestamp,
    ) -> EngineResult<u64> {
        if ids.len() > MAX_ACK_BATCH {
            return Err(CoreError::Validation(format!(
                "at most {MAX_ACK_BATCH} ids may be acknowledged at once"
            ))
            .into());
        }
        if ids.is_empty() {
            return Ok(0);
        }
        let acknowledged = UpdateRepo::acknowledge(&self.ctx.pool, ids, recipient, now).await?;
        tracing::debug!(requested = ids.len(), acknowledged, "Updates acknowledged");
        Ok(acknowledged)
    }

    /// Periodic reaper: acknowledged rows past the retention window, and every
    /// row past its TTL.
    pub async fn reap(&self, now: Timestamp) -> EngineResult<u64> {
        self.delete_stale(now - self.ctx.config.update_retention(), now)
            .await
    }

    /// Delete acknowledged rows acknowledged before `older_than`, and every
    /// row past its TTL at `now`.
    pub async fn delete_stale(&self, older_than: Timestamp, now: Timestamp) -> EngineResult<u64> {
        if older_than > now {
            return Err(CoreError::Validation("older_than must not be in the future".into()).into());
        }
        Ok(UpdateRepo::delete_stale(&self.ctx.pool, older_than, now).await?)
    }

    /// Drop eligibility snapshots of generations closed before the audit
    /// retention window.
    pub async fn purge_closed_snapshots(&self, now: Timestamp) -> EngineResult<u64> {
        let cutoff = now - self.ctx.config.audit_retention();
        Ok(AttributionRepo::purge_closed_eligibility(&self.ctx.pool, cutoff).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn fan_out_stamps_ttl_from_config() {
        let cfg = DispatchConfig::default();
        let now = Utc::now();
        let mut fan_out = FanOut::new(now, &cfg);
        fan_out.notify(
            1,
            RecipientType::Professional,
            2,
            UpdateType::NewOpportunity,
            serde_json::json!({}),
        );
        assert_eq!(fan_out.update_count(), 1);
        assert_eq!(fan_out.updates[0].created_at, now);
        assert_eq!(fan_out.updates[0].expires_at - now, cfg.update_ttl());
    }

    #[tokio::test]
    async fn publish_emits_one_intent_per_update() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let mut fan_out = FanOut::new(Utc::now(), &DispatchConfig::default());
        fan_out.notify(
            5,
            RecipientType::Professional,
            8,
            UpdateType::JobTaken,
            serde_json::json!({"attribution_id": 5}),
        );
        fan_out.publish(&bus);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, dispatch_events::signals::NOTIFICATION_INTENT);
        assert_eq!(event.payload["kind"], "job_taken");
        assert_eq!(event.payload["recipient_id"], 8);
    }
}
