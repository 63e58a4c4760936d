//! Repository for the `attribution_updates` outbox ledger.
//!
//! Rows are append-only. The only mutation is the acknowledgment flag;
//! deletion happens in [`UpdateRepo::delete_stale`].

use dispatch_core::types::{DbId, Timestamp};
use dispatch_core::updates::RecipientType;
use sqlx::PgExecutor;

use crate::models::update::{NewUpdate, UpdateEntry};

/// Column list for `attribution_updates` queries.
const COLUMNS: &str = "\
    id, attribution_id, recipient_type, recipient_id, update_type, payload, \
    created_at, acknowledged, acknowledged_at, expires_at";

/// Provides outbox write, poll and acknowledgment operations.
pub struct UpdateRepo;

impl UpdateRepo {
    /// Append one update.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &NewUpdate,
    ) -> Result<UpdateEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO attribution_updates \
                 (attribution_id, recipient_type, recipient_id, update_type, payload, \
                  created_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, UpdateEntry>(&query)
            .bind(input.attribution_id)
            .bind(input.recipient_type.as_str())
            .bind(input.recipient_id)
            .bind(input.update_type.as_str())
            .bind(&input.payload)
            .bind(input.created_at)
            .bind(input.expires_at)
            .fetch_one(executor)
            .await
    }

    /// Unacknowledged, unexpired updates for one recipient, oldest first.
    ///
    /// `since` is best-effort: `created_at` is stamped before the writing
    /// transaction commits, so a slower concurrent commit can land rows dated
    /// before a cursor the caller already moved past. Polling without `since`
    /// redelivers every unacknowledged row until it is acknowledged or its
    /// TTL passes.
    pub async fn poll<'e, E: PgExecutor<'e>>(
        executor: E,
        recipient_type: RecipientType,
        recipient_id: DbId,
        since: Option<Timestamp>,
        limit: i64,
        now: Timestamp,
    ) -> Result<Vec<UpdateEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attribution_updates \
             WHERE recipient_type = $1 AND recipient_id = $2 \
               AND acknowledged = false \
               AND expires_at > $3 \
               AND ($4::TIMESTAMPTZ IS NULL OR created_at > $4) \
             ORDER BY id ASC \
             LIMIT $5"
        );
        sqlx::query_as::<_, UpdateEntry>(&query)
            .bind(recipient_type.as_str())
            .bind(recipient_id)
            .bind(now)
            .bind(since)
            .bind(limit)
            .fetch_all(executor)
            .await
    }

    /// Mark updates as acknowledged.
    ///
    /// Unknown ids are ignored. When `recipient` is given, ids addressed to
    /// anyone else are ignored too. Already-acknowledged rows are left
    /// untouched, so they keep their first `acknowledged_at`. Returns the
    /// number of rows newly acknowledged by this call.
    pub async fn acknowledge<'e, E: PgExecutor<'e>>(
        executor: E,
        ids: &[DbId],
        recipient: Option<(RecipientType, DbId)>,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE attribution_updates \
             SET acknowledged = true, acknowledged_at = $4 \
             WHERE id = ANY($1) AND acknowledged = false \
               AND ($2::TEXT IS NULL OR (recipient_type = $2 AND recipient_id = $3))",
        )
        .bind(ids)
        .bind(recipient.map(|(t, _)| t.as_str()))
        .bind(recipient.map(|(_, id)| id))
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete acknowledged rows older than `acked_before` and rows whose TTL
    /// passed at `now`. Returns the number of rows deleted.
    pub async fn delete_stale<'e, E: PgExecutor<'e>>(
        executor: E,
        acked_before: Timestamp,
        now: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM attribution_updates \
             WHERE (acknowledged = true AND acknowledged_at < $1) \
                OR expires_at <= $2",
        )
        .bind(acked_before)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    /// Every update written for an attribution, in write order.
    pub async fn list_for_attribution<'e, E: PgExecutor<'e>>(
        executor: E,
        attribution_id: DbId,
    ) -> Result<Vec<UpdateEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attribution_updates \
             WHERE attribution_id = $1 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, UpdateEntry>(&query)
            .bind(attribution_id)
            .fetch_all(executor)
            .await
    }
}
