//! Repository for the `eligibility_entries` table.
//!
//! Rows are written once per (attribution, professional) and never updated.

use dispatch_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::eligibility::EligibilityEntry;

/// Column list for `eligibility_entries` queries.
const COLUMNS: &str =
    "id, attribution_id, professional_id, distance_km, broadcast_round, computed_at";

/// Provides snapshot operations for eligibility entries.
pub struct EligibilityRepo;

impl EligibilityRepo {
    /// Record that `professional_id` was eligible for the attribution.
    ///
    /// Returns `None` if the professional was already recorded for this
    /// generation (already notified).
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        attribution_id: DbId,
        professional_id: DbId,
        distance_km: f64,
        broadcast_round: i32,
        now: Timestamp,
    ) -> Result<Option<EligibilityEntry>, sqlx::Error> {
        let query = format!(
            "INSERT INTO eligibility_entries \
                 (attribution_id, professional_id, distance_km, broadcast_round, computed_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT ON CONSTRAINT uq_eligibility_entries_attribution_professional DO NOTHING \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, EligibilityEntry>(&query)
            .bind(attribution_id)
            .bind(professional_id)
            .bind(distance_km)
            .bind(broadcast_round)
            .bind(now)
            .fetch_optional(executor)
            .await
    }

    /// All entries for an attribution, nearest first.
    pub async fn list_for_attribution<'e, E: PgExecutor<'e>>(
        executor: E,
        attribution_id: DbId,
    ) -> Result<Vec<EligibilityEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM eligibility_entries \
             WHERE attribution_id = $1 \
             ORDER BY distance_km ASC, professional_id ASC"
        );
        sqlx::query_as::<_, EligibilityEntry>(&query)
            .bind(attribution_id)
            .fetch_all(executor)
            .await
    }

    /// Whether the professional is in the attribution's snapshot.
    pub async fn is_eligible<'e, E: PgExecutor<'e>>(
        executor: E,
        attribution_id: DbId,
        professional_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM eligibility_entries \
                 WHERE attribution_id = $1 AND professional_id = $2 \
             )",
        )
        .bind(attribution_id)
        .bind(professional_id)
        .fetch_one(executor)
        .await
    }

    /// Eligible professionals other than `excluded`.
    pub async fn professional_ids_except<'e, E: PgExecutor<'e>>(
        executor: E,
        attribution_id: DbId,
        excluded: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT professional_id FROM eligibility_entries \
             WHERE attribution_id = $1 AND professional_id <> $2 \
             ORDER BY professional_id",
        )
        .bind(attribution_id)
        .bind(excluded)
        .fetch_all(executor)
        .await
    }

    /// Eligible professionals who never recorded any response.
    pub async fn silent_professional_ids<'e, E: PgExecutor<'e>>(
        executor: E,
        attribution_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT e.professional_id FROM eligibility_entries e \
             WHERE e.attribution_id = $1 \
               AND NOT EXISTS ( \
                   SELECT 1 FROM attribution_responses r \
                   WHERE r.attribution_id = e.attribution_id \
                     AND r.professional_id = e.professional_id \
               ) \
             ORDER BY e.professional_id",
        )
        .bind(attribution_id)
        .fetch_all(executor)
        .await
    }
}
