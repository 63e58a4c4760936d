//! Acceptance Arbitrator.
//!
//! The winner is decided by a single conditional `UPDATE` guarded on the
//! record still being BROADCASTING with nobody accepted. The transition, the
//! winning response row and the fan-out updates commit together; a caller
//! that does not perform the transition gets `won = false` and leaves only a
//! `lost` response row behind.

use dispatch_core::attribution::state_machine;
use dispatch_core::error::CoreError;
use dispatch_core::types::{DbId, Timestamp};
use dispatch_core::updates::{RecipientType, UpdateType};
use dispatch_db::models::attribution::Attribution;
use dispatch_db::models::response::{ResponseEntry, ResponseKind};
use dispatch_db::models::status::AttributionStatus;
use dispatch_db::repositories::{AttributionRepo, EligibilityRepo, ResponseRepo};
use serde::Serialize;

use crate::error::EngineResult;
use crate::ledger::{payload, FanOut};
use crate::EngineContext;

/// How an accept attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptResult {
    /// The caller holds the job.
    Won,
    /// Another professional holds (or completed) the job.
    AlreadyTaken,
    /// Nobody holds the job and nobody can: the record expired or was
    /// cancelled.
    NoLongerAvailable,
}

/// Result of `attemptAccept`.
#[derive(Debug, Clone, Serialize)]
pub struct AcceptOutcome {
    pub won: bool,
    pub outcome: AcceptResult,
    pub attribution_id: DbId,
    pub status: &'static str,
}

impl AcceptOutcome {
    fn new(outcome: AcceptResult, attribution: &Attribution) -> Self {
        Self {
            won: outcome == AcceptResult::Won,
            outcome,
            attribution_id: attribution.id,
            status: state_machine::status_name(attribution.status_id),
        }
    }
}

#[derive(Clone)]
pub struct AcceptanceArbitrator {
    ctx: EngineContext,
}

impl AcceptanceArbitrator {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// `attemptAccept(attributionId, professionalId)`.
    ///
    /// Exactly one caller among any number of concurrent callers wins. A
    /// retry from the recorded winner reports `won = true` again without
    /// further side effects. Any store failure is returned as an error and
    /// never as a win.
    pub async fn attempt_accept(
        &self,
        attribution_id: DbId,
        professional_id: DbId,
        now: Timestamp,
    ) -> EngineResult<AcceptOutcome> {
        let current = self.load_for_response(attribution_id, professional_id).await?;
        if current.accepted_professional_id == Some(professional_id) {
            return Ok(AcceptOutcome::new(AcceptResult::Won, &current));
        }

        let mut tx = self.ctx.pool.begin().await?;

        let Some(won) =
            AttributionRepo::try_accept(&mut *tx, attribution_id, professional_id, now).await?
        else {
            // The guarded update matched nothing: read who (if anyone) got
            // there first.
            let latest = AttributionRepo::find_by_id(&mut *tx, attribution_id)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "attribution",
                    id: attribution_id,
                })?;
            if latest.accepted_professional_id == Some(professional_id) {
                tx.rollback().await?;
                return Ok(AcceptOutcome::new(AcceptResult::Won, &latest));
            }

            ResponseRepo::record(&mut *tx, attribution_id, professional_id, ResponseKind::Lost, now)
                .await?;
            tx.commit().await?;

            let outcome = if latest.accepted_professional_id.is_some() {
                AcceptResult::AlreadyTaken
            } else {
                AcceptResult::NoLongerAvailable
            };
            tracing::debug!(
                attribution_id,
                professional_id,
                status = state_machine::status_name(latest.status_id),
                "Accept attempt lost",
            );
            return Ok(AcceptOutcome::new(outcome, &latest));
        };

        ResponseRepo::record(
            &mut *tx,
            attribution_id,
            professional_id,
            ResponseKind::Accepted,
            now,
        )
        .await?;

        let mut fan_out = FanOut::new(now, &self.ctx.config);
        fan_out.notify(
            won.id,
            RecipientType::Professional,
            professional_id,
            UpdateType::AcceptedConfirmation,
            payload::accepted_confirmation(&won),
        );
        for other in
            EligibilityRepo::professional_ids_except(&mut *tx, attribution_id, professional_id)
                .await?
        {
            fan_out.notify(
                won.id,
                RecipientType::Professional,
                other,
                UpdateType::JobTaken,
                payload::job_taken(&won),
            );
        }
        fan_out.notify_client(
            &won,
            UpdateType::ProfessionalAssigned,
            payload::professional_assigned(&won),
        );
        fan_out.write(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(
            attribution_id,
            professional_id,
            booking_id = won.booking_id,
            notified = fan_out.update_count(),
            "Attribution accepted",
        );
        fan_out.publish(&self.ctx.bus);

        Ok(AcceptOutcome::new(AcceptResult::Won, &won))
    }

    /// `DeclineAttempt(attributionId, professionalId)`.
    ///
    /// Recorded for audit; never changes the attribution's status.
    pub async fn decline(
        &self,
        attribution_id: DbId,
        professional_id: DbId,
        now: Timestamp,
    ) -> EngineResult<ResponseEntry> {
        let current = self.load_for_response(attribution_id, professional_id).await?;
        if !current.is_status(AttributionStatus::Broadcasting) {
            return Err(CoreError::Conflict(format!(
                "attribution {attribution_id} is {} and no longer takes responses",
                state_machine::status_name(current.status_id)
            ))
            .into());
        }

        let entry = ResponseRepo::record(
            &self.ctx.pool,
            attribution_id,
            professional_id,
            ResponseKind::Declined,
            now,
        )
        .await?;
        tracing::info!(attribution_id, professional_id, "Attribution declined");
        Ok(entry)
    }

    /// `JobCompleted(attributionId)`: ACCEPTED -> COMPLETED.
    pub async fn complete(&self, attribution_id: DbId, now: Timestamp) -> EngineResult<Attribution> {
        if let Some(done) = AttributionRepo::try_complete(&self.ctx.pool, attribution_id, now).await? {
            tracing::info!(
                attribution_id,
                professional_id = ?done.accepted_professional_id,
                "Attribution completed",
            );
            return Ok(done);
        }

        let current = AttributionRepo::find_by_id(&self.ctx.pool, attribution_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "attribution",
                id: attribution_id,
            })?;
        let message = state_machine::validate_transition(
            current.status_id,
            AttributionStatus::Completed.id(),
        )
        .err()
        .unwrap_or_else(|| format!("attribution {attribution_id} changed concurrently"));
        Err(CoreError::Conflict(message).into())
    }

    /// Load the attribution and check the professional is in its eligibility
    /// snapshot.
    async fn load_for_response(
        &self,
        attribution_id: DbId,
        professional_id: DbId,
    ) -> EngineResult<Attribution> {
        let attribution = AttributionRepo::find_by_id(&self.ctx.pool, attribution_id)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "attribution",
                id: attribution_id,
            })?;

        if !EligibilityRepo::is_eligible(&self.ctx.pool, attribution_id, professional_id).await? {
            return Err(CoreError::Forbidden(format!(
                "professional {professional_id} is not eligible for attribution {attribution_id}"
            ))
            .into());
        }
        Ok(attribution)
    }
}
