//! Professional profile models and DTOs.

use dispatch_core::eligibility::CandidateProfile;
use dispatch_core::geo::GeoPoint;
use dispatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `professionals` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Professional {
    pub id: DbId,
    pub display_name: String,
    pub base_lat: f64,
    pub base_lng: f64,
    pub service_radius_km: Option<f64>,
    pub service_categories: Vec<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub rating: Option<f64>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Professional {
    /// The evaluator's view of this profile.
    pub fn candidate_profile(&self) -> CandidateProfile {
        CandidateProfile {
            professional_id: self.id,
            base_location: GeoPoint {
                lat: self.base_lat,
                lng: self.base_lng,
            },
            service_radius_km: self.service_radius_km,
            service_categories: self.service_categories.clone(),
            is_active: self.is_active,
            is_verified: self.is_verified,
            rating: self.rating,
        }
    }
}

/// DTO for `POST /api/v1/professionals`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProfessional {
    pub display_name: String,
    pub base_location: GeoPoint,
    pub service_radius_km: Option<f64>,
    pub service_categories: Vec<String>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub rating: Option<f64>,
}

/// DTO for `PUT /api/v1/professionals/{id}`. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfessional {
    pub display_name: Option<String>,
    pub base_location: Option<GeoPoint>,
    pub service_radius_km: Option<f64>,
    pub service_categories: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub rating: Option<f64>,
}
