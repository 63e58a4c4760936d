//! Outbox ledger rows and polling DTOs.

use dispatch_core::types::{DbId, Timestamp};
use dispatch_core::updates::{RecipientType, UpdateType};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `attribution_updates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UpdateEntry {
    pub id: DbId,
    pub attribution_id: DbId,
    pub recipient_type: String,
    pub recipient_id: DbId,
    pub update_type: String,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub acknowledged: bool,
    pub acknowledged_at: Option<Timestamp>,
    pub expires_at: Timestamp,
}

/// Wire shape returned by `GET /api/v1/updates`.
#[derive(Debug, Clone, Serialize)]
pub struct PolledUpdate {
    pub id: DbId,
    pub attribution_id: DbId,
    #[serde(rename = "type")]
    pub update_type: String,
    pub payload: serde_json::Value,
    pub timestamp: Timestamp,
}

impl From<UpdateEntry> for PolledUpdate {
    fn from(entry: UpdateEntry) -> Self {
        Self {
            id: entry.id,
            attribution_id: entry.attribution_id,
            update_type: entry.update_type,
            payload: entry.payload,
            timestamp: entry.created_at,
        }
    }
}

/// Query parameters for `GET /api/v1/updates`.
#[derive(Debug, Deserialize)]
pub struct PollQuery {
    pub recipient_id: DbId,
    /// `professional` (default) or `client`.
    pub recipient_type: Option<String>,
    /// Only entries created strictly after this instant.
    pub since: Option<Timestamp>,
    pub limit: Option<i64>,
}

/// Body of `POST /api/v1/updates/acknowledge`.
///
/// When `recipient_id` is present, only that recipient's entries are
/// acknowledged.
#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    pub ids: Vec<DbId>,
    pub recipient_type: Option<String>,
    pub recipient_id: Option<DbId>,
}

/// Insert parameters for one outbox row.
#[derive(Debug, Clone)]
pub struct NewUpdate {
    pub attribution_id: DbId,
    pub recipient_type: RecipientType,
    pub recipient_id: DbId,
    pub update_type: UpdateType,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}
