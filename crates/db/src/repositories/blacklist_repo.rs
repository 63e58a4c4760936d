//! Repository for the `blacklist_entries` and `no_response_strikes` tables.

use dispatch_core::blacklist::BlacklistReason;
use dispatch_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::blacklist::BlacklistEntry;

/// Column list for `blacklist_entries` queries.
const COLUMNS: &str =
    "id, professional_id, reason, attribution_id, note, created_at, expires_at, cleared_at";

/// Predicate selecting entries in force at bind parameter `$n`.
fn active_at(param: u32) -> String {
    format!("cleared_at IS NULL AND (expires_at IS NULL OR expires_at > ${param})")
}

/// Insert parameters for a blacklist entry.
#[derive(Debug, Clone)]
pub struct NewBlacklistEntry<'a> {
    pub professional_id: DbId,
    pub reason: BlacklistReason,
    pub attribution_id: Option<DbId>,
    pub note: Option<&'a str>,
    pub expires_at: Option<Timestamp>,
    pub now: Timestamp,
}

/// Provides blacklist ledger operations.
pub struct BlacklistRepo;

impl BlacklistRepo {
    /// Create an entry.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewBlacklistEntry<'_>,
    ) -> Result<BlacklistEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO blacklist_entries \
                 (professional_id, reason, attribution_id, note, created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BlacklistEntry>(&query)
            .bind(input.professional_id)
            .bind(input.reason.as_str())
            .bind(input.attribution_id)
            .bind(input.note)
            .bind(input.now)
            .bind(input.expires_at)
            .fetch_one(executor)
            .await
    }

    /// Which of `professional_ids` are blacklisted at `now`.
    pub async fn active_among<'e, E: PgExecutor<'e>>(
        executor: E,
        professional_ids: &[DbId],
        now: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let query = format!(
            "SELECT DISTINCT professional_id FROM blacklist_entries \
             WHERE professional_id = ANY($1) AND {}",
            active_at(2)
        );
        sqlx::query_scalar(&query)
            .bind(professional_ids)
            .bind(now)
            .fetch_all(executor)
            .await
    }

    /// Whether the professional has any entry in force at `now`.
    pub async fn has_active<'e, E: PgExecutor<'e>>(
        executor: E,
        professional_id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "SELECT EXISTS (SELECT 1 FROM blacklist_entries WHERE professional_id = $1 AND {})",
            active_at(2)
        );
        sqlx::query_scalar(&query)
            .bind(professional_id)
            .bind(now)
            .fetch_one(executor)
            .await
    }

    /// Entries in force at `now`, optionally for one professional.
    pub async fn list_active<'e, E: PgExecutor<'e>>(
        executor: E,
        professional_id: Option<DbId>,
        now: Timestamp,
    ) -> Result<Vec<BlacklistEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM blacklist_entries \
             WHERE ($1::BIGINT IS NULL OR professional_id = $1) AND {} \
             ORDER BY created_at DESC",
            active_at(2)
        );
        sqlx::query_as::<_, BlacklistEntry>(&query)
            .bind(professional_id)
            .bind(now)
            .fetch_all(executor)
            .await
    }

    /// Manually clear an entry. Returns `None` if it does not exist or was
    /// already cleared.
    pub async fn clear<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        now: Timestamp,
    ) -> Result<Option<BlacklistEntry>, sqlx::Error> {
        let query = format!(
            "UPDATE blacklist_entries SET cleared_at = $2 \
             WHERE id = $1 AND cleared_at IS NULL \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BlacklistEntry>(&query)
            .bind(id)
            .bind(now)
            .fetch_optional(executor)
            .await
    }
}

/// Provides no-response strike bookkeeping.
pub struct StrikeRepo;

impl StrikeRepo {
    /// Record one strike for a silent professional on a closed generation.
    ///
    /// Returns `false` if the strike already existed.
    pub async fn record<'e, E: PgExecutor<'e>>(
        executor: E,
        professional_id: DbId,
        attribution_id: DbId,
        now: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO no_response_strikes (professional_id, attribution_id, created_at) \
             VALUES ($1, $2, $3) \
             ON CONFLICT ON CONSTRAINT uq_no_response_strikes_professional_attribution DO NOTHING",
        )
        .bind(professional_id)
        .bind(attribution_id)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of strikes recorded for the professional since `since`.
    pub async fn count_since<'e, E: PgExecutor<'e>>(
        executor: E,
        professional_id: DbId,
        since: Timestamp,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM no_response_strikes \
             WHERE professional_id = $1 AND created_at >= $2",
        )
        .bind(professional_id)
        .bind(since)
        .fetch_one(executor)
        .await
    }
}
