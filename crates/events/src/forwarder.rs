//! Hands outbound signals to external collaborators.
//!
//! [`SignalForwarder`] subscribes to the bus and POSTs each event to the
//! webhook configured for its type. Deliveries run concurrently in a
//! [`JoinSet`] capped at `max_in_flight`; at the cap the forwarder stops
//! reading the bus until one finishes. Failures are logged and dropped.
//!
//! When the bus closes, in-flight deliveries are awaited. Cancellation aborts
//! whatever is still running.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::bus::OutboundEvent;
use crate::delivery::webhook::WebhookDelivery;
use crate::signals::{DISPATCH_ESCALATION, NOTIFICATION_INTENT};

/// Webhook destinations per signal kind. Unset means "not forwarded".
#[derive(Debug, Clone, Default)]
pub struct ForwarderConfig {
    pub notification_webhook_url: Option<String>,
    pub escalation_webhook_url: Option<String>,
}

impl ForwarderConfig {
    /// Load from `NOTIFICATION_WEBHOOK_URL` and `OPS_ESCALATION_WEBHOOK_URL`.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            notification_webhook_url: non_empty("NOTIFICATION_WEBHOOK_URL"),
            escalation_webhook_url: non_empty("OPS_ESCALATION_WEBHOOK_URL"),
        }
    }

    /// Destination for an event type, if one is configured.
    pub fn route(&self, event_type: &str) -> Option<&str> {
        match event_type {
            NOTIFICATION_INTENT => self.notification_webhook_url.as_deref(),
            DISPATCH_ESCALATION => self.escalation_webhook_url.as_deref(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notification_webhook_url.is_none() && self.escalation_webhook_url.is_none()
    }
}

/// Default cap on concurrent webhook deliveries.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

/// Background service forwarding signals to webhooks.
pub struct SignalForwarder {
    config: ForwarderConfig,
    delivery: Arc<WebhookDelivery>,
    max_in_flight: usize,
}

impl SignalForwarder {
    pub fn new(config: ForwarderConfig, delivery: WebhookDelivery) -> Self {
        Self {
            config,
            delivery: Arc::new(delivery),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Replace the concurrent delivery cap (minimum 1).
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Run the forwarding loop until the bus closes or `cancel` fires.
    pub async fn run(
        self,
        mut receiver: broadcast::Receiver<OutboundEvent>,
        cancel: CancellationToken,
    ) {
        let mut in_flight = JoinSet::new();

        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(aborted = in_flight.len(), "Signal forwarder stopping");
                    return;
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => continue,
                received = receiver.recv(), if in_flight.len() < self.max_in_flight => received,
            };

            match received {
                Ok(event) => self.dispatch(&mut in_flight, event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Signal forwarder lagged, signals dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }

        let drained = tokio::select! {
            _ = cancel.cancelled() => false,
            _ = async { while in_flight.join_next().await.is_some() {} } => true,
        };
        if drained {
            tracing::info!("Signal forwarder drained");
        } else {
            tracing::warn!(
                aborted = in_flight.len(),
                "Signal forwarder cancelled with deliveries in flight"
            );
        }
    }

    fn dispatch(&self, in_flight: &mut JoinSet<()>, event: OutboundEvent) {
        let Some(url) = self.config.route(&event.event_type) else {
            return;
        };
        let url = url.to_string();
        let delivery = Arc::clone(&self.delivery);
        in_flight.spawn(async move {
            if delivery.deliver(&url, &event).await.is_err() {
                tracing::warn!(
                    event_type = %event.event_type,
                    source_entity_id = ?event.source_entity_id,
                    "Outbound signal not delivered"
                );
            }
        });
    }
}
