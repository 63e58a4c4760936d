//! Attribution lifecycle: status state machine and re-broadcast policy.
//!
//! Status IDs match the `attribution_statuses` seed data (1-based SMALLSERIAL).
//! The `db` crate mirrors them in its `AttributionStatus` enum.

use serde::Serialize;

use crate::config::DispatchConfig;

/// BROADCASTING: visible to eligible professionals, nobody has won yet.
pub const STATUS_BROADCASTING: i16 = 1;
/// ACCEPTED: exactly one professional holds the job.
pub const STATUS_ACCEPTED: i16 = 2;
/// COMPLETED: terminal, immutable.
pub const STATUS_COMPLETED: i16 = 3;
/// EXPIRED: terminal, nobody accepted within the allowed attempts.
pub const STATUS_EXPIRED: i16 = 4;
/// CANCELLED: terminal for this generation; a new generation follows.
pub const STATUS_CANCELLED: i16 = 5;

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

pub mod state_machine {
    use super::*;

    /// Returns the set of valid target status IDs reachable from `from_status`.
    ///
    /// Terminal states (Completed, Expired, Cancelled) return an empty slice.
    pub fn valid_transitions(from_status: i16) -> &'static [i16] {
        match from_status {
            STATUS_BROADCASTING => &[STATUS_ACCEPTED, STATUS_EXPIRED],
            STATUS_ACCEPTED => &[STATUS_COMPLETED, STATUS_CANCELLED],
            _ => &[],
        }
    }

    /// Check whether a transition from `from` to `to` is valid.
    pub fn can_transition(from: i16, to: i16) -> bool {
        valid_transitions(from).contains(&to)
    }

    /// Validate a state transition, returning an error message for invalid ones.
    pub fn validate_transition(from: i16, to: i16) -> Result<(), String> {
        if can_transition(from, to) {
            Ok(())
        } else {
            Err(format!(
                "Invalid transition: {} ({from}) -> {} ({to})",
                status_name(from),
                status_name(to)
            ))
        }
    }

    /// Whether no further transition can leave `status`.
    pub fn is_terminal(status: i16) -> bool {
        valid_transitions(status).is_empty()
    }

    /// Whether the status holds a professional (`acceptedProfessionalId` set).
    pub fn holds_professional(status: i16) -> bool {
        matches!(status, STATUS_ACCEPTED | STATUS_COMPLETED)
    }

    /// Lower-case status name as exposed over the API.
    pub fn status_name(id: i16) -> &'static str {
        match id {
            STATUS_BROADCASTING => "broadcasting",
            STATUS_ACCEPTED => "accepted",
            STATUS_COMPLETED => "completed",
            STATUS_EXPIRED => "expired",
            STATUS_CANCELLED => "cancelled",
            _ => "unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Re-broadcast policy
// ---------------------------------------------------------------------------

/// Why an attribution expired unfilled. Carried by the escalation signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryReason {
    /// Nobody was ever eligible across all attempts.
    NoEligibleCandidates,
    /// Candidates were notified but no response was ever recorded.
    NoResponse,
    /// Responses were recorded, all of them declines.
    AllDeclined,
}

impl ExpiryReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoEligibleCandidates => "no_eligible_candidates",
            Self::NoResponse => "no_response",
            Self::AllDeclined => "all_declined",
        }
    }
}

/// What the scheduler should do with a broadcasting record whose timeout
/// elapsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanDecision {
    /// Extend the current generation with a wider radius.
    Rebroadcast {
        next_broadcast_count: i32,
        next_radius_km: f64,
    },
    /// Transition to EXPIRED and escalate.
    Expire(ExpiryReason),
}

/// Snapshot of a due record's counters used by [`decide`].
#[derive(Debug, Clone, Copy)]
pub struct DueRecord {
    pub broadcast_count: i32,
    pub max_distance_km: f64,
    /// Number of professionals notified across all rounds of this generation.
    pub eligible_count: i32,
    /// Number of responses (of any kind) recorded for this generation.
    pub response_count: i64,
}

/// Radius for the next round: grown by the configured factor, capped.
pub fn next_radius(current_km: f64, config: &DispatchConfig) -> f64 {
    (current_km * config.radius_growth_factor).min(config.max_radius_km)
}

/// Decide between widening and expiring.
///
/// A record with `broadcast_count >= max_attempts` always expires; it never
/// loops. Below the limit it is re-broadcast even when declines exist, since
/// newly reached professionals may still accept.
pub fn decide(record: &DueRecord, config: &DispatchConfig) -> ScanDecision {
    if record.broadcast_count < config.max_attempts {
        return ScanDecision::Rebroadcast {
            next_broadcast_count: record.broadcast_count + 1,
            next_radius_km: next_radius(record.max_distance_km, config),
        };
    }

    let reason = if record.eligible_count == 0 {
        ExpiryReason::NoEligibleCandidates
    } else if record.response_count == 0 {
        ExpiryReason::NoResponse
    } else {
        ExpiryReason::AllDeclined
    };
    ScanDecision::Expire(reason)
}
