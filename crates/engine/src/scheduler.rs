//! Expiry & Re-broadcast Scheduler.
//!
//! Scan-based and safe to run as several concurrent instances: every
//! transition it performs is guarded on the `broadcast_count` it observed,
//! so each round of a generation happens at most once whoever scans it.

use std::time::Duration;

use chrono::Utc;
use dispatch_core::attribution::{decide, state_machine, DueRecord, ExpiryReason, ScanDecision};
use dispatch_core::blacklist::BlacklistReason;
use dispatch_core::error::CoreError;
use dispatch_core::types::{DbId, Timestamp};
use dispatch_core::updates::{RecipientType, UpdateType};
use dispatch_db::models::attribution::Attribution;
use dispatch_db::models::blacklist::BlacklistEntry;
use dispatch_db::models::status::AttributionStatus;
use dispatch_db::repositories::{
    AttributionRepo, BlacklistRepo, EligibilityRepo, NewBlacklistEntry, ResponseRepo,
};
use dispatch_events::EscalationSignal;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::EngineResult;
use crate::ledger::{payload, FanOut};
use crate::orchestrator::{run_round, start_generation};
use crate::{strikes, EngineContext};

/// Counters for one scheduler pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub scanned: usize,
    pub rebroadcast: usize,
    pub expired: usize,
    /// Records another scheduler instance (or an accept) handled first.
    pub skipped: usize,
    pub failed: usize,
}

/// What happened to one due record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanAction {
    Rebroadcast,
    Expired,
    Skipped,
}

/// Result of `AcceptedProfessionalCancelled`.
#[derive(Debug, Clone, Serialize)]
pub struct CancellationOutcome {
    /// The now-CANCELLED generation.
    pub cancelled: Attribution,
    /// The new BROADCASTING generation for the same booking.
    pub next: Attribution,
    pub blacklist_entry: BlacklistEntry,
}

#[derive(Clone)]
pub struct ExpiryScheduler {
    ctx: EngineContext,
}

impl ExpiryScheduler {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Run the scan loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        let interval = Duration::from_secs(self.ctx.config.scan_interval_secs);
        let mut ticker = tokio::time::interval(interval);
        tracing::info!(
            interval_secs = interval.as_secs(),
            max_attempts = self.ctx.config.max_attempts,
            "Expiry scheduler started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Expiry scheduler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.run_once(Utc::now()).await {
                        Ok(report) if report.scanned > 0 => {
                            tracing::info!(
                                scanned = report.scanned,
                                rebroadcast = report.rebroadcast,
                                expired = report.expired,
                                skipped = report.skipped,
                                failed = report.failed,
                                "Scheduler pass complete",
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "Scheduler pass failed"),
                    }
                }
            }
        }
    }

    /// One pass over due BROADCASTING records.
    ///
    /// A failure on one record is logged and counted; the pass continues
    /// with the next. Failing to list due records fails the pass.
    pub async fn run_once(&self, now: Timestamp) -> EngineResult<ScanReport> {
        let config = &self.ctx.config;
        let due = AttributionRepo::list_due(
            &self.ctx.pool,
            now - config.response_timeout(),
            now - config.empty_pool_retry(),
            config.scan_batch_size,
        )
        .await?;

        let mut report = ScanReport {
            scanned: due.len(),
            ..ScanReport::default()
        };
        for attribution in due {
            match self.handle_due(&attribution, now).await {
                Ok(ScanAction::Rebroadcast) => report.rebroadcast += 1,
                Ok(ScanAction::Expired) => report.expired += 1,
                Ok(ScanAction::Skipped) => report.skipped += 1,
                Err(e) => {
                    tracing::error!(
                        attribution_id = attribution.id,
                        error = %e,
                        "Failed to process due attribution",
                    );
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    async fn handle_due(&self, attribution: &Attribution, now: Timestamp) -> EngineResult<ScanAction> {
        let response_count =
            ResponseRepo::count_for_attribution(&self.ctx.pool, attribution.id).await?;
        let record = DueRecord {
            broadcast_count: attribution.broadcast_count,
            max_distance_km: attribution.max_distance_km,
            eligible_count: attribution.eligible_count,
            response_count,
        };

        match decide(&record, &self.ctx.config) {
            ScanDecision::Rebroadcast { next_radius_km, .. } => {
                self.rebroadcast(attribution, next_radius_km, now).await
            }
            ScanDecision::Expire(reason) => self.expire(attribution, reason, now).await,
        }
    }

    /// Widen the current generation and notify newly reached professionals.
    async fn rebroadcast(
        &self,
        attribution: &Attribution,
        next_radius_km: f64,
        now: Timestamp,
    ) -> EngineResult<ScanAction> {
        let mut tx = self.ctx.pool.begin().await?;
        let Some(widened) = AttributionRepo::try_rebroadcast(
            &mut *tx,
            attribution.id,
            attribution.broadcast_count,
            next_radius_km,
            now,
        )
        .await?
        else {
            return Ok(ScanAction::Skipped);
        };

        let mut fan_out = FanOut::new(now, &self.ctx.config);
        let reached = run_round(
            &mut *tx,
            &self.ctx,
            &widened,
            UpdateType::Rebroadcast,
            now,
            &mut fan_out,
        )
        .await?;
        fan_out.write(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(
            attribution_id = widened.id,
            broadcast_count = widened.broadcast_count,
            radius_km = widened.max_distance_km,
            newly_eligible = reached.len(),
            "Attribution re-broadcast",
        );
        fan_out.publish(&self.ctx.bus);
        Ok(ScanAction::Rebroadcast)
    }

    /// BROADCASTING -> EXPIRED, with fan-out, strikes and escalation.
    async fn expire(
        &self,
        attribution: &Attribution,
        reason: ExpiryReason,
        now: Timestamp,
    ) -> EngineResult<ScanAction> {
        let mut tx = self.ctx.pool.begin().await?;
        let Some(expired) =
            AttributionRepo::try_expire(&mut *tx, attribution.id, attribution.broadcast_count, now)
                .await?
        else {
            return Ok(ScanAction::Skipped);
        };

        let mut fan_out = FanOut::new(now, &self.ctx.config);
        for entry in EligibilityRepo::list_for_attribution(&mut *tx, expired.id).await? {
            fan_out.notify(
                expired.id,
                RecipientType::Professional,
                entry.professional_id,
                UpdateType::OpportunityExpired,
                payload::expired(&expired, reason),
            );
        }
        fan_out.notify_client(
            &expired,
            UpdateType::DispatchExpired,
            payload::expired(&expired, reason),
        );
        fan_out.escalate(EscalationSignal {
            booking_id: expired.booking_id,
            attribution_id: expired.id,
            generation: expired.generation,
            reason,
            broadcast_count: expired.broadcast_count,
            max_distance_km: expired.max_distance_km,
        });

        let blacklisted = strikes::record_no_response(&mut *tx, &self.ctx, expired.id, now).await?;
        fan_out.write(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(
            attribution_id = expired.id,
            booking_id = expired.booking_id,
            broadcast_count = expired.broadcast_count,
            reason = reason.as_str(),
            blacklisted = blacklisted.len(),
            "Attribution expired, escalating",
        );
        fan_out.publish(&self.ctx.bus);
        Ok(ScanAction::Expired)
    }

    /// `AcceptedProfessionalCancelled(attributionId)`.
    ///
    /// In one transaction: ACCEPTED -> CANCELLED, blacklist the cancelling
    /// professional, and broadcast a new generation for the same booking.
    /// The fresh blacklist entry keeps the canceller out of the new
    /// generation.
    pub async fn cancel_acceptance(
        &self,
        attribution_id: DbId,
        now: Timestamp,
    ) -> EngineResult<CancellationOutcome> {
        let config = &self.ctx.config;
        let mut tx = self.ctx.pool.begin().await?;

        let Some(cancelled) =
            AttributionRepo::try_cancel_acceptance(&mut *tx, attribution_id, now).await?
        else {
            let current = AttributionRepo::find_by_id(&mut *tx, attribution_id)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "attribution",
                    id: attribution_id,
                })?;
            return Err(CoreError::Conflict(
                state_machine::validate_transition(
                    current.status_id,
                    AttributionStatus::Cancelled.id(),
                )
                .err()
                .unwrap_or_else(|| format!("attribution {attribution_id} changed concurrently")),
            )
            .into());
        };

        let professional_id = cancelled.cancelled_professional_id.ok_or_else(|| {
            CoreError::Internal(format!(
                "cancelled attribution {attribution_id} has no cancelling professional"
            ))
        })?;

        let reason = BlacklistReason::CancellationAfterAccept;
        let blacklist_entry = BlacklistRepo::create(
            &mut *tx,
            &NewBlacklistEntry {
                professional_id,
                reason,
                attribution_id: Some(cancelled.id),
                note: None,
                expires_at: reason.default_expiry(now, config),
                now,
            },
        )
        .await?;

        let mut fan_out = FanOut::new(now, config);
        let (next, reached) = start_generation(
            &mut *tx,
            &self.ctx,
            &cancelled.booking_snapshot(),
            cancelled.generation + 1,
            Some(cancelled.id),
            config.initial_radius_km,
            now,
            &mut fan_out,
        )
        .await?;

        let notice = payload::assignment_cancelled(&cancelled, next.id);
        fan_out.notify(
            cancelled.id,
            RecipientType::Professional,
            professional_id,
            UpdateType::AssignmentCancelled,
            notice.clone(),
        );
        fan_out.notify_client(&cancelled, UpdateType::AssignmentCancelled, notice);
        fan_out.write(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(
            attribution_id = cancelled.id,
            next_attribution_id = next.id,
            booking_id = cancelled.booking_id,
            professional_id,
            generation = next.generation,
            eligible = reached.len(),
            "Acceptance cancelled, new generation broadcast",
        );
        fan_out.publish(&self.ctx.bus);

        Ok(CancellationOutcome {
            cancelled,
            next,
            blacklist_entry,
        })
    }
}
