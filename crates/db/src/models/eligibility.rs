//! Eligibility snapshot rows.

use dispatch_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `eligibility_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EligibilityEntry {
    pub id: DbId,
    pub attribution_id: DbId,
    pub professional_id: DbId,
    pub distance_km: f64,
    /// The `broadcast_count` of the round that first reached this professional.
    pub broadcast_round: i32,
    pub computed_at: Timestamp,
}
