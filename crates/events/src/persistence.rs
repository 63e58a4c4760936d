//! Durable signal log.
//!
//! [`EventPersistence`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! and writes every [`OutboundEvent`] to `dispatch_events`. It runs until
//! the bus closes or the cancellation token fires.

use dispatch_core::types::DbId;
use dispatch_db::repositories::EventRepo;
use dispatch_db::DbPool;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::bus::OutboundEvent;

/// Background service that persists outbound signals.
pub struct EventPersistence;

impl EventPersistence {
    /// Run the persistence loop.
    pub async fn run(
        pool: DbPool,
        mut receiver: broadcast::Receiver<OutboundEvent>,
        cancel: CancellationToken,
    ) {
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Event persistence stopping");
                    break;
                }
                received = receiver.recv() => received,
            };

            match received {
                Ok(event) => {
                    if let Err(e) = Self::persist(&pool, &event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to persist outbound event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event persistence lagged, some events were not persisted"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, persistence shutting down");
                    break;
                }
            }
        }
    }

    /// Write a single event to `dispatch_events`.
    pub async fn persist(pool: &DbPool, event: &OutboundEvent) -> Result<DbId, sqlx::Error> {
        EventRepo::insert(
            pool,
            &event.event_type,
            event.source_entity_type.as_deref(),
            event.source_entity_id,
            &event.payload,
        )
        .await
    }
}
