//! Update/outbox ledger vocabulary: update types and recipient kinds.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default page size for `pollUpdates`.
pub const DEFAULT_POLL_LIMIT: i64 = 50;

/// Maximum page size for `pollUpdates`.
pub const MAX_POLL_LIMIT: i64 = 200;

/// Maximum number of ids accepted by one `acknowledge` call.
pub const MAX_ACK_BATCH: usize = 500;

/// Who an update is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    Professional,
    Client,
}

impl RecipientType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Professional => "professional",
            Self::Client => "client",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "professional" => Ok(Self::Professional),
            "client" => Ok(Self::Client),
            other => Err(CoreError::Validation(format!(
                "unknown recipient_type '{other}'"
            ))),
        }
    }
}

impl Default for RecipientType {
    fn default() -> Self {
        Self::Professional
    }
}

/// The closed set of update kinds written to the outbox ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    /// A professional became eligible in the first round of a generation.
    NewOpportunity,
    /// A professional became eligible in a widened round.
    Rebroadcast,
    /// Someone else won; the opportunity is gone.
    JobTaken,
    /// The recipient won the race.
    AcceptedConfirmation,
    /// The attribution expired unfilled.
    OpportunityExpired,
    /// Client: a professional was assigned.
    ProfessionalAssigned,
    /// Client: dispatch gave up.
    DispatchExpired,
    /// Client and cancelling professional: the assignment was withdrawn.
    AssignmentCancelled,
}

impl UpdateType {
    pub const ALL: [UpdateType; 8] = [
        Self::NewOpportunity,
        Self::Rebroadcast,
        Self::JobTaken,
        Self::AcceptedConfirmation,
        Self::OpportunityExpired,
        Self::ProfessionalAssigned,
        Self::DispatchExpired,
        Self::AssignmentCancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewOpportunity => "new_opportunity",
            Self::Rebroadcast => "rebroadcast",
            Self::JobTaken => "job_taken",
            Self::AcceptedConfirmation => "accepted_confirmation",
            Self::OpportunityExpired => "opportunity_expired",
            Self::ProfessionalAssigned => "professional_assigned",
            Self::DispatchExpired => "dispatch_expired",
            Self::AssignmentCancelled => "assignment_cancelled",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == raw)
            .ok_or_else(|| CoreError::Validation(format!("unknown update_type '{raw}'")))
    }

    /// Whether this update advertises a live opportunity.
    pub fn is_opportunity(self) -> bool {
        matches!(self, Self::NewOpportunity | Self::Rebroadcast)
    }
}

/// Clamp a requested poll page size into `1..=MAX_POLL_LIMIT`.
pub fn clamp_poll_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_POLL_LIMIT).clamp(1, MAX_POLL_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_type_names_round_trip() {
        for t in UpdateType::ALL {
            assert_eq!(UpdateType::parse(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn update_type_serde_matches_as_str() {
        for t in UpdateType::ALL {
            assert_eq!(serde_json::to_value(t).unwrap(), t.as_str());
        }
    }

    #[test]
    fn unknown_update_type_is_rejected() {
        assert!(UpdateType::parse("surprise").is_err());
    }

    #[test]
    fn only_opportunities_are_opportunities() {
        assert!(UpdateType::NewOpportunity.is_opportunity());
        assert!(UpdateType::Rebroadcast.is_opportunity());
        assert!(!UpdateType::JobTaken.is_opportunity());
    }

    #[test]
    fn recipient_type_parses() {
        assert_eq!(
            RecipientType::parse("client").unwrap(),
            RecipientType::Client
        );
        assert!(RecipientType::parse("admin").is_err());
    }

    #[test]
    fn poll_limit_is_clamped() {
        assert_eq!(clamp_poll_limit(None), DEFAULT_POLL_LIMIT);
        assert_eq!(clamp_poll_limit(Some(0)), 1);
        assert_eq!(clamp_poll_limit(Some(10_000)), MAX_POLL_LIMIT);
    }
}
