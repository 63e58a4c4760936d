//! Blacklist ledger policy.
//!
//! Entries are written by the scheduler (repeated no-response) and by the
//! cancellation path (cancellation after acceptance), or manually by staff.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::config::DispatchConfig;
use crate::error::CoreError;
use crate::types::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistReason {
    NoResponse,
    CancellationAfterAccept,
    Manual,
}

impl BlacklistReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoResponse => "no_response",
            Self::CancellationAfterAccept => "cancellation_after_accept",
            Self::Manual => "manual",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw {
            "no_response" => Ok(Self::NoResponse),
            "cancellation_after_accept" => Ok(Self::CancellationAfterAccept),
            "manual" => Ok(Self::Manual),
            other => Err(CoreError::Validation(format!(
                "unknown blacklist reason '{other}'"
            ))),
        }
    }

    /// Expiry for an automatically created entry of this reason.
    ///
    /// Manual entries never expire on their own; staff set an explicit
    /// expiry or clear them.
    pub fn default_expiry(self, now: Timestamp, config: &DispatchConfig) -> Option<Timestamp> {
        match self {
            Self::NoResponse => Some(now + Duration::hours(config.no_response_blacklist_hours)),
            Self::CancellationAfterAccept => {
                Some(now + Duration::hours(config.cancel_blacklist_hours))
            }
            Self::Manual => None,
        }
    }
}

/// Whether an entry with the given expiry/clearance is in force at `now`.
pub fn is_active(expires_at: Option<Timestamp>, cleared_at: Option<Timestamp>, now: Timestamp) -> bool {
    cleared_at.is_none() && expires_at.map_or(true, |e| e > now)
}

/// Whether `strikes` within the counting window warrant a no-response entry.
pub fn strikes_exceeded(strikes: i64, config: &DispatchConfig) -> bool {
    strikes >= config.no_response_strike_limit
}

/// Start of the strike-counting window ending at `now`.
pub fn strike_window_start(now: Timestamp, config: &DispatchConfig) -> Timestamp {
    now - Duration::hours(config.no_response_window_hours)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn reason_names_round_trip() {
        for r in [
            BlacklistReason::NoResponse,
            BlacklistReason::CancellationAfterAccept,
            BlacklistReason::Manual,
        ] {
            assert_eq!(BlacklistReason::parse(r.as_str()).unwrap(), r);
        }
    }

    #[test]
    fn cancellation_entry_expires_after_configured_hours() {
        let cfg = DispatchConfig::default();
        let now = Utc::now();
        let expiry = BlacklistReason::CancellationAfterAccept
            .default_expiry(now, &cfg)
            .unwrap();
        assert_eq!(expiry - now, Duration::hours(cfg.cancel_blacklist_hours));
    }

    #[test]
    fn manual_entry_has_no_default_expiry() {
        let cfg = DispatchConfig::default();
        assert!(BlacklistReason::Manual
            .default_expiry(Utc::now(), &cfg)
            .is_none());
    }

    #[test]
    fn active_until_expiry() {
        let now = Utc::now();
        assert!(is_active(Some(now + Duration::minutes(1)), None, now));
        assert!(!is_active(Some(now - Duration::minutes(1)), None, now));
        assert!(!is_active(Some(now), None, now));
    }

    #[test]
    fn open_ended_entry_is_active() {
        assert!(is_active(None, None, Utc::now()));
    }

    #[test]
    fn cleared_entry_is_inactive() {
        let now = Utc::now();
        assert!(!is_active(None, Some(now), now));
    }

    #[test]
    fn strike_limit_is_inclusive() {
        let cfg = DispatchConfig::default();
        assert!(!strikes_exceeded(cfg.no_response_strike_limit - 1, &cfg));
        assert!(strikes_exceeded(cfg.no_response_strike_limit, &cfg));
    }
}
