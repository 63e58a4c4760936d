//! Geo/Eligibility Evaluator.
//!
//! A pure function of its inputs: given a booking, a candidate pool, a search
//! radius and the set of currently blacklisted professionals, it returns the
//! eligible candidates sorted by ascending distance.
//!
//! Eligibility rules are a closed set of [`EligibilityCondition`] kinds with
//! typed parameters. A policy must name every mandatory condition explicitly;
//! an empty or partial policy is rejected rather than treated as
//! "always eligible".

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::booking::BookingSnapshot;
use crate::error::CoreError;
use crate::geo::GeoPoint;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Inputs / outputs
// ---------------------------------------------------------------------------

/// The parts of a professional's profile the evaluator looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateProfile {
    pub professional_id: DbId,
    pub base_location: GeoPoint,
    /// How far the professional is willing to travel, if they declared it.
    pub service_radius_km: Option<f64>,
    pub service_categories: Vec<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub rating: Option<f64>,
}

/// One row of the evaluator's output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EligibleCandidate {
    pub professional_id: DbId,
    pub distance_km: f64,
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// A single eligibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EligibilityCondition {
    /// The booking's category is one of the candidate's declared categories.
    ServiceCategory,
    /// The candidate is both active and verified.
    ActiveVerified,
    /// Distance to the booking is within the broadcast radius.
    WithinBroadcastRadius,
    /// The candidate has no current blacklist entry.
    NotBlacklisted,
    /// Distance is also within the candidate's own declared service radius.
    /// Candidates without a declared radius pass.
    WithinServiceArea,
    /// The candidate's rating is at least `min_rating`. Unrated candidates fail.
    MinimumRating { min_rating: f64 },
}

/// Why a candidate was excluded, for logging and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ineligibility {
    CategoryMismatch,
    InactiveOrUnverified,
    OutsideBroadcastRadius,
    Blacklisted,
    OutsideServiceArea,
    RatingTooLow,
}

/// Conditions every policy must contain.
pub const MANDATORY_CONDITIONS: [EligibilityCondition; 4] = [
    EligibilityCondition::ServiceCategory,
    EligibilityCondition::ActiveVerified,
    EligibilityCondition::WithinBroadcastRadius,
    EligibilityCondition::NotBlacklisted,
];

/// An ordered, validated list of conditions. All must hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityPolicy {
    conditions: Vec<EligibilityCondition>,
}

impl EligibilityPolicy {
    /// Build a policy from an explicit list of conditions.
    ///
    /// Rejects an empty list, a list missing any mandatory condition, and
    /// out-of-range parameters.
    pub fn new(conditions: Vec<EligibilityCondition>) -> Result<Self, CoreError> {
        if conditions.is_empty() {
            return Err(CoreError::Validation(
                "eligibility policy must list its conditions explicitly".into(),
            ));
        }

        for mandatory in MANDATORY_CONDITIONS {
            if !conditions.contains(&mandatory) {
                return Err(CoreError::Validation(format!(
                    "eligibility policy is missing mandatory condition {mandatory:?}"
                )));
            }
        }

        for condition in &conditions {
            if let EligibilityCondition::MinimumRating { min_rating } = condition {
                if !min_rating.is_finite() || *min_rating < 0.0 {
                    return Err(CoreError::Validation(format!(
                        "minimum rating must be a non-negative number, got {min_rating}"
                    )));
                }
            }
        }

        Ok(Self { conditions })
    }

    /// The four mandatory conditions plus the professional's own service area.
    pub fn standard() -> Self {
        let mut conditions = MANDATORY_CONDITIONS.to_vec();
        conditions.push(EligibilityCondition::WithinServiceArea);
        Self { conditions }
    }

    /// Return a copy of this policy with `condition` appended (deduplicated).
    pub fn with(mut self, condition: EligibilityCondition) -> Result<Self, CoreError> {
        if !self.conditions.contains(&condition) {
            self.conditions.push(condition);
        }
        Self::new(self.conditions)
    }

    pub fn conditions(&self) -> &[EligibilityCondition] {
        &self.conditions
    }
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Everything a condition needs to decide about one candidate.
struct Subject<'a> {
    booking: &'a BookingSnapshot,
    candidate: &'a CandidateProfile,
    distance_km: f64,
    radius_km: f64,
    blacklist: &'a HashSet<DbId>,
}

impl EligibilityCondition {
    fn check(&self, s: &Subject<'_>) -> Result<(), Ineligibility> {
        let holds = match self {
            Self::ServiceCategory => s
                .candidate
                .service_categories
                .iter()
                .any(|c| c.trim().eq_ignore_ascii_case(&s.booking.service_category)),
            Self::ActiveVerified => s.candidate.is_active && s.candidate.is_verified,
            Self::WithinBroadcastRadius => s.distance_km <= s.radius_km,
            Self::NotBlacklisted => !s.blacklist.contains(&s.candidate.professional_id),
            Self::WithinServiceArea => s
                .candidate
                .service_radius_km
                .map_or(true, |r| s.distance_km <= r),
            Self::MinimumRating { min_rating } => {
                s.candidate.rating.is_some_and(|r| r >= *min_rating)
            }
        };

        if holds {
            Ok(())
        } else {
            Err(self.failure())
        }
    }

    fn failure(&self) -> Ineligibility {
        match self {
            Self::ServiceCategory => Ineligibility::CategoryMismatch,
            Self::ActiveVerified => Ineligibility::InactiveOrUnverified,
            Self::WithinBroadcastRadius => Ineligibility::OutsideBroadcastRadius,
            Self::NotBlacklisted => Ineligibility::Blacklisted,
            Self::WithinServiceArea => Ineligibility::OutsideServiceArea,
            Self::MinimumRating { .. } => Ineligibility::RatingTooLow,
        }
    }
}

/// Decide a single candidate. Returns the distance when eligible, or the
/// first failing condition otherwise.
pub fn check_candidate(
    booking: &BookingSnapshot,
    candidate: &CandidateProfile,
    radius_km: f64,
    blacklist: &HashSet<DbId>,
    policy: &EligibilityPolicy,
) -> Result<f64, Ineligibility> {
    let subject = Subject {
        booking,
        candidate,
        distance_km: candidate.base_location.distance_km(&booking.location),
        radius_km,
        blacklist,
    };

    for condition in policy.conditions() {
        condition.check(&subject)?;
    }
    Ok(subject.distance_km)
}

/// `evaluate(booking, candidatePool, radiusKm)`.
///
/// Output is sorted by ascending distance (ties by professional id). The
/// ordering is advisory only; every returned candidate may accept. An empty
/// result is not an error.
pub fn evaluate(
    booking: &BookingSnapshot,
    candidates: &[CandidateProfile],
    radius_km: f64,
    blacklist: &HashSet<DbId>,
    policy: &EligibilityPolicy,
) -> Vec<EligibleCandidate> {
    let mut eligible: Vec<EligibleCandidate> = candidates
        .iter()
        .filter_map(|candidate| {
            check_candidate(booking, candidate, radius_km, blacklist, policy)
                .ok()
                .map(|distance_km| EligibleCandidate {
                    professional_id: candidate.professional_id,
                    distance_km,
                })
        })
        .collect();

    // A pool may list a professional twice; keep the nearest eligible copy.
    eligible.sort_by(|a, b| {
        a.professional_id
            .cmp(&b.professional_id)
            .then(a.distance_km.total_cmp(&b.distance_km))
    });
    eligible.dedup_by_key(|c| c.professional_id);

    eligible.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then(a.professional_id.cmp(&b.professional_id))
    });
    eligible
}
