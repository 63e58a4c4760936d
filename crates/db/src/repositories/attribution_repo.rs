//! Repository for the `attributions` table.
//!
//! Every status change is a single conditional `UPDATE ... WHERE` on the
//! expected prior state, returning the row only when this caller performed
//! the transition. Callers never read-then-write a status.

use dispatch_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::attribution::{Attribution, NewAttribution};
use crate::models::status::AttributionStatus;

/// Column list for `attributions` queries.
const COLUMNS: &str = "\
    id, booking_id, customer_id, generation, previous_attribution_id, status_id, \
    service_category, service_lat, service_lng, scheduled_at, amount_cents, \
    max_distance_km, accepted_professional_id, cancelled_professional_id, \
    broadcast_count, eligible_count, \
    created_at, last_broadcast_at, accepted_at, closed_at, updated_at";

/// Provides the attribution state machine's persistence operations.
pub struct AttributionRepo;

impl AttributionRepo {
    /// Insert a new BROADCASTING generation with `broadcast_count = 1`.
    ///
    /// Fails with a unique violation on `uq_attributions_active_booking` if
    /// the booking already has a non-terminal generation.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewAttribution<'_>,
    ) -> Result<Attribution, sqlx::Error> {
        let query = format!(
            "INSERT INTO attributions \
                 (booking_id, customer_id, generation, previous_attribution_id, status_id, \
                  service_category, service_lat, service_lng, scheduled_at, amount_cents, \
                  max_distance_km, broadcast_count, eligible_count, \
                  created_at, last_broadcast_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 1, 0, $12, $12, $12) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attribution>(&query)
            .bind(input.booking.booking_id)
            .bind(input.booking.customer_id)
            .bind(input.generation)
            .bind(input.previous_attribution_id)
            .bind(AttributionStatus::Broadcasting.id())
            .bind(&input.booking.service_category)
            .bind(input.booking.location.lat)
            .bind(input.booking.location.lng)
            .bind(input.booking.scheduled_at)
            .bind(input.booking.amount_cents)
            .bind(input.max_distance_km)
            .bind(input.now)
            .fetch_one(executor)
            .await
    }

    /// Find an attribution by its ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Attribution>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM attributions WHERE id = $1");
        sqlx::query_as::<_, Attribution>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// The booking's live (BROADCASTING or ACCEPTED) generation, if any.
    pub async fn find_active_for_booking<'e, E: PgExecutor<'e>>(
        executor: E,
        booking_id: DbId,
    ) -> Result<Option<Attribution>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attributions \
             WHERE booking_id = $1 AND status_id IN ($2, $3)"
        );
        sqlx::query_as::<_, Attribution>(&query)
            .bind(booking_id)
            .bind(AttributionStatus::Broadcasting.id())
            .bind(AttributionStatus::Accepted.id())
            .fetch_optional(executor)
            .await
    }

    /// Every generation for a booking, oldest first.
    pub async fn list_for_booking<'e, E: PgExecutor<'e>>(
        executor: E,
        booking_id: DbId,
    ) -> Result<Vec<Attribution>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attributions \
             WHERE booking_id = $1 \
             ORDER BY generation ASC, id ASC"
        );
        sqlx::query_as::<_, Attribution>(&query)
            .bind(booking_id)
            .fetch_all(executor)
            .await
    }

    /// Add `delta` newly notified professionals to the running total.
    pub async fn add_eligible<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        delta: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE attributions SET eligible_count = eligible_count + $2 WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// BROADCASTING -> ACCEPTED, guarded on the record still broadcasting
    /// with nobody accepted.
    ///
    /// Returns the updated row for the single caller that performed the
    /// transition; every other caller gets `None`.
    pub async fn try_accept<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        professional_id: DbId,
        now: Timestamp,
    ) -> Result<Option<Attribution>, sqlx::Error> {
        let query = format!(
            "UPDATE attributions \
             SET status_id = $3, accepted_professional_id = $2, accepted_at = $4, updated_at = $4 \
             WHERE id = $1 AND status_id = $5 AND accepted_professional_id IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attribution>(&query)
            .bind(id)
            .bind(professional_id)
            .bind(AttributionStatus::Accepted.id())
            .bind(now)
            .bind(AttributionStatus::Broadcasting.id())
            .fetch_optional(executor)
            .await
    }

    /// Widen the current generation: bump `broadcast_count`, grow the
    /// radius, reset `last_broadcast_at`.
    ///
    /// Guarded on `broadcast_count = expected_count` so concurrent scheduler
    /// instances perform each round at most once.
    pub async fn try_rebroadcast<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        expected_count: i32,
        next_radius_km: f64,
        now: Timestamp,
    ) -> Result<Option<Attribution>, sqlx::Error> {
        let query = format!(
            "UPDATE attributions \
             SET broadcast_count = broadcast_count + 1, max_distance_km = $3, \
                 last_broadcast_at = $4, updated_at = $4 \
             WHERE id = $1 AND status_id = $5 AND broadcast_count = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attribution>(&query)
            .bind(id)
            .bind(expected_count)
            .bind(next_radius_km)
            .bind(now)
            .bind(AttributionStatus::Broadcasting.id())
            .fetch_optional(executor)
            .await
    }

    /// BROADCASTING -> EXPIRED, guarded like [`Self::try_rebroadcast`].
    pub async fn try_expire<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        expected_count: i32,
        now: Timestamp,
    ) -> Result<Option<Attribution>, sqlx::Error> {
        let query = format!(
            "UPDATE attributions \
             SET status_id = $3, closed_at = $4, updated_at = $4 \
             WHERE id = $1 AND status_id = $5 AND broadcast_count = $2 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attribution>(&query)
            .bind(id)
            .bind(expected_count)
            .bind(AttributionStatus::Expired.id())
            .bind(now)
            .bind(AttributionStatus::Broadcasting.id())
            .fetch_optional(executor)
            .await
    }

    /// ACCEPTED -> CANCELLED. Moves the professional into
    /// `cancelled_professional_id` so `accepted_professional_id` stays null
    /// outside ACCEPTED/COMPLETED.
    pub async fn try_cancel_acceptance<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        now: Timestamp,
    ) -> Result<Option<Attribution>, sqlx::Error> {
        let query = format!(
            "UPDATE attributions \
             SET status_id = $2, cancelled_professional_id = accepted_professional_id, \
                 accepted_professional_id = NULL, closed_at = $3, updated_at = $3 \
             WHERE id = $1 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attribution>(&query)
            .bind(id)
            .bind(AttributionStatus::Cancelled.id())
            .bind(now)
            .bind(AttributionStatus::Accepted.id())
            .fetch_optional(executor)
            .await
    }

    /// ACCEPTED -> COMPLETED.
    pub async fn try_complete<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        now: Timestamp,
    ) -> Result<Option<Attribution>, sqlx::Error> {
        let query = format!(
            "UPDATE attributions \
             SET status_id = $2, closed_at = $3, updated_at = $3 \
             WHERE id = $1 AND status_id = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Attribution>(&query)
            .bind(id)
            .bind(AttributionStatus::Completed.id())
            .bind(now)
            .bind(AttributionStatus::Accepted.id())
            .fetch_optional(executor)
            .await
    }

    /// BROADCASTING records whose timeout elapsed, oldest first.
    ///
    /// Records whose broadcasts so far reached nobody use the shorter
    /// `empty_cutoff`.
    pub async fn list_due<'e, E: PgExecutor<'e>>(
        executor: E,
        response_cutoff: Timestamp,
        empty_cutoff: Timestamp,
        limit: i64,
    ) -> Result<Vec<Attribution>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attributions \
             WHERE status_id = $1 \
               AND ((eligible_count > 0 AND last_broadcast_at <= $2) \
                 OR (eligible_count = 0 AND last_broadcast_at <= $3)) \
             ORDER BY last_broadcast_at ASC \
             LIMIT $4"
        );
        sqlx::query_as::<_, Attribution>(&query)
            .bind(AttributionStatus::Broadcasting.id())
            .bind(response_cutoff)
            .bind(empty_cutoff)
            .bind(limit)
            .fetch_all(executor)
            .await
    }

    /// Delete eligibility snapshots of generations closed before `cutoff`.
    ///
    /// Attribution rows and responses are kept for the audit chain.
    pub async fn purge_closed_eligibility<'e, E: PgExecutor<'e>>(
        executor: E,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM eligibility_entries e \
             USING attributions a \
             WHERE e.attribution_id = a.id \
               AND a.closed_at IS NOT NULL \
               AND a.closed_at < $1",
        )
        .bind(cutoff)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
