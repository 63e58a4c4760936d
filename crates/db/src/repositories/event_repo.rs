//! Repository for the `dispatch_events` table.

use dispatch_core::types::DbId;
use sqlx::PgExecutor;

use crate::models::event::DispatchEvent;

/// Column list for `dispatch_events` queries.
const COLUMNS: &str = "id, event_type, source_entity_type, source_entity_id, payload, created_at";

/// Provides append and read access to the outbound signal log.
pub struct EventRepo;

impl EventRepo {
    /// Persist one signal, returning its new ID.
    pub async fn insert<'e, E: PgExecutor<'e>>(
        executor: E,
        event_type: &str,
        source_entity_type: Option<&str>,
        source_entity_id: Option<DbId>,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO dispatch_events (event_type, source_entity_type, source_entity_id, payload) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id",
        )
        .bind(event_type)
        .bind(source_entity_type)
        .bind(source_entity_id)
        .bind(payload)
        .fetch_one(executor)
        .await
    }

    /// Most recent signals, optionally filtered by type.
    pub async fn list_recent<'e, E: PgExecutor<'e>>(
        executor: E,
        event_type: Option<&str>,
        limit: i64,
    ) -> Result<Vec<DispatchEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM dispatch_events \
             WHERE ($1::TEXT IS NULL OR event_type = $1) \
             ORDER BY id DESC \
             LIMIT $2"
        );
        sqlx::query_as::<_, DispatchEvent>(&query)
            .bind(event_type)
            .bind(limit)
            .fetch_all(executor)
            .await
    }
}
