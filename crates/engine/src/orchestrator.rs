//! Broadcast Orchestrator.
//!
//! The only place attribution generations are minted. A broadcast round
//! evaluates the candidate pool, snapshots the eligible set and queues an
//! opportunity update for every professional reached for the first time in
//! this generation.

use std::collections::HashSet;

use dispatch_core::booking::{BookingConfirmed, BookingSnapshot};
use dispatch_core::eligibility::{evaluate, CandidateProfile, EligibleCandidate};
use dispatch_core::types::{DbId, Timestamp};
use dispatch_core::updates::{RecipientType, UpdateType};
use dispatch_db::models::attribution::{Attribution, NewAttribution};
use dispatch_db::repositories::{
    AttributionRepo, BlacklistRepo, EligibilityRepo, ProfessionalRepo,
};
use serde::Serialize;
use sqlx::PgConnection;

use crate::error::{is_unique_violation, EngineResult};
use crate::ledger::{payload, FanOut};
use crate::EngineContext;

/// Partial unique index allowing one live generation per booking.
const ACTIVE_BOOKING_INDEX: &str = "uq_attributions_active_booking";

/// Result of handling a `BookingConfirmed` signal.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastOutcome {
    pub attribution: Attribution,
    /// `false` when the signal was a duplicate and the live generation was
    /// returned unchanged.
    pub created: bool,
    /// Professionals notified by this call, nearest first.
    pub eligible: Vec<EligibleCandidate>,
}

#[derive(Clone)]
pub struct BroadcastOrchestrator {
    ctx: EngineContext,
}

impl BroadcastOrchestrator {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Handle `BookingConfirmed`: validate, then broadcast generation 1 at the
    /// initial radius.
    ///
    /// Duplicate delivery of the signal returns the booking's live generation
    /// instead of minting a second one.
    pub async fn booking_confirmed(
        &self,
        signal: &BookingConfirmed,
        now: Timestamp,
    ) -> EngineResult<BroadcastOutcome> {
        let booking = signal.validate()?;

        if let Some(existing) = self.existing_outcome(booking.booking_id).await? {
            return Ok(existing);
        }

        match self
            .broadcast(&booking, self.ctx.config.initial_radius_km, now)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(crate::EngineError::Store(e)) if is_unique_violation(&e, ACTIVE_BOOKING_INDEX) => {
                // Lost a race with a concurrent duplicate of the same signal.
                match self.existing_outcome(booking.booking_id).await? {
                    Some(existing) => Ok(existing),
                    None => Err(e.into()),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// `broadcast(booking, radiusKm)`: mint a first generation for the
    /// booking and run its first round.
    pub async fn broadcast(
        &self,
        booking: &BookingSnapshot,
        radius_km: f64,
        now: Timestamp,
    ) -> EngineResult<BroadcastOutcome> {
        let mut fan_out = FanOut::new(now, &self.ctx.config);
        let mut tx = self.ctx.pool.begin().await?;
        let (attribution, eligible) =
            start_generation(&mut *tx, &self.ctx, booking, 1, None, radius_km, now, &mut fan_out)
                .await?;
        fan_out.write(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(
            attribution_id = attribution.id,
            booking_id = attribution.booking_id,
            radius_km,
            eligible = eligible.len(),
            "Attribution broadcast",
        );
        fan_out.publish(&self.ctx.bus);

        Ok(BroadcastOutcome {
            attribution,
            created: true,
            eligible,
        })
    }

    async fn existing_outcome(&self, booking_id: DbId) -> EngineResult<Option<BroadcastOutcome>> {
        let existing = AttributionRepo::find_active_for_booking(&self.ctx.pool, booking_id).await?;
        Ok(existing.map(|attribution| {
            tracing::debug!(
                attribution_id = attribution.id,
                booking_id,
                "Duplicate BookingConfirmed, returning live generation",
            );
            BroadcastOutcome {
                attribution,
                created: false,
                eligible: Vec::new(),
            }
        }))
    }
}

/// Insert a BROADCASTING generation and run its first round on `conn`.
///
/// The caller writes `fan_out` and commits.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn start_generation(
    conn: &mut PgConnection,
    ctx: &EngineContext,
    booking: &BookingSnapshot,
    generation: i32,
    previous_attribution_id: Option<DbId>,
    radius_km: f64,
    now: Timestamp,
    fan_out: &mut FanOut,
) -> EngineResult<(Attribution, Vec<EligibleCandidate>)> {
    let attribution = AttributionRepo::insert(
        &mut *conn,
        &NewAttribution {
            booking,
            generation,
            previous_attribution_id,
            max_distance_km: radius_km,
            now,
        },
    )
    .await?;

    let reached = run_round(
        conn,
        ctx,
        &attribution,
        UpdateType::NewOpportunity,
        now,
        fan_out,
    )
    .await?;

    let attribution = Attribution {
        eligible_count: attribution.eligible_count + reached.len() as i32,
        ..attribution
    };
    Ok((attribution, reached))
}

/// One eligibility round at the attribution's current radius.
///
/// Returns the professionals reached for the first time in this generation;
/// their opportunity updates are queued on `fan_out`.
/// Already-notified professionals are skipped by the eligibility snapshot's
/// unique key.
pub(crate) async fn run_round(
    conn: &mut PgConnection,
    ctx: &EngineContext,
    attribution: &Attribution,
    update_type: UpdateType,
    now: Timestamp,
    fan_out: &mut FanOut,
) -> EngineResult<Vec<EligibleCandidate>> {
    let booking = attribution.booking_snapshot();
    let radius_km = attribution.max_distance_km;

    let candidates: Vec<CandidateProfile> = ProfessionalRepo::list_candidates(
        &mut *conn,
        &booking.service_category,
        booking.location.lat,
        radius_km,
    )
    .await?
    .iter()
    .map(|p| p.candidate_profile())
    .collect();

    let ids: Vec<DbId> = candidates.iter().map(|c| c.professional_id).collect();
    let blacklisted: HashSet<DbId> = if ids.is_empty() {
        HashSet::new()
    } else {
        BlacklistRepo::active_among(&mut *conn, &ids, now)
            .await?
            .into_iter()
            .collect()
    };

    let eligible = evaluate(&booking, &candidates, radius_km, &blacklisted, &ctx.policy);

    let mut reached = Vec::with_capacity(eligible.len());
    for candidate in eligible {
        let inserted = EligibilityRepo::insert(
            &mut *conn,
            attribution.id,
            candidate.professional_id,
            candidate.distance_km,
            attribution.broadcast_count,
            now,
        )
        .await?;
        if inserted.is_some() {
            fan_out.notify(
                attribution.id,
                RecipientType::Professional,
                candidate.professional_id,
                update_type,
                payload::opportunity(attribution, candidate.distance_km),
            );
            reached.push(candidate);
        }
    }

    if !reached.is_empty() {
        AttributionRepo::add_eligible(&mut *conn, attribution.id, reached.len() as i32).await?;
    }

    tracing::debug!(
        attribution_id = attribution.id,
        broadcast_count = attribution.broadcast_count,
        radius_km,
        candidates = candidates.len(),
        blacklisted = blacklisted.len(),
        reached = reached.len(),
        "Eligibility round complete",
    );
    Ok(reached)
}
