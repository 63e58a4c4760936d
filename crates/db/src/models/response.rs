//! Response log rows.

use dispatch_core::error::CoreError;
use dispatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `attribution_responses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ResponseEntry {
    pub id: DbId,
    pub attribution_id: DbId,
    pub professional_id: DbId,
    pub response: String,
    pub responded_at: Timestamp,
}

/// The kinds of response stored in `attribution_responses.response`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// The winning acceptance. At most one per attribution.
    Accepted,
    /// An explicit decline; never changes the attribution status.
    Declined,
    /// An accept attempt that reached a record no longer broadcasting.
    Lost,
}

impl ResponseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Lost => "lost",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "lost" => Ok(Self::Lost),
            other => Err(CoreError::Validation(format!(
                "unknown response kind '{other}'"
            ))),
        }
    }
}
