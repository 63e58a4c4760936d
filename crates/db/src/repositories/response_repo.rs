//! Repository for the append-only `attribution_responses` table.

use dispatch_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::response::{ResponseEntry, ResponseKind};

/// Column list for `attribution_responses` queries.
const COLUMNS: &str = "id, attribution_id, professional_id, response, responded_at";

/// Provides append and read operations for the response log.
pub struct ResponseRepo;

impl ResponseRepo {
    /// Append a response.
    pub async fn record<'e, E: PgExecutor<'e>>(
        executor: E,
        attribution_id: DbId,
        professional_id: DbId,
        kind: ResponseKind,
        now: Timestamp,
    ) -> Result<ResponseEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO attribution_responses (attribution_id, professional_id, response, responded_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ResponseEntry>(&query)
            .bind(attribution_id)
            .bind(professional_id)
            .bind(kind.as_str())
            .bind(now)
            .fetch_one(executor)
            .await
    }

    /// Full response log for an attribution, in arrival order.
    pub async fn list_for_attribution<'e, E: PgExecutor<'e>>(
        executor: E,
        attribution_id: DbId,
    ) -> Result<Vec<ResponseEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM attribution_responses \
             WHERE attribution_id = $1 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, ResponseEntry>(&query)
            .bind(attribution_id)
            .fetch_all(executor)
            .await
    }

    /// Number of responses of any kind recorded for an attribution.
    pub async fn count_for_attribution<'e, E: PgExecutor<'e>>(
        executor: E,
        attribution_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM attribution_responses WHERE attribution_id = $1")
            .bind(attribution_id)
            .fetch_one(executor)
            .await
    }
}
