//! Blacklist ledger rows and DTOs.

use dispatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `blacklist_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BlacklistEntry {
    pub id: DbId,
    pub professional_id: DbId,
    pub reason: String,
    pub attribution_id: Option<DbId>,
    pub note: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub cleared_at: Option<Timestamp>,
}

/// DTO for `POST /api/v1/admin/blacklist` (manual entries).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateManualBlacklist {
    pub professional_id: DbId,
    pub note: Option<String>,
    pub expires_at: Option<Timestamp>,
}

/// Query parameters for `GET /api/v1/admin/blacklist`.
#[derive(Debug, Deserialize)]
pub struct BlacklistListQuery {
    pub professional_id: Option<DbId>,
}
