//! Repository for the `professionals` read model.

use dispatch_core::booking::normalize_category;
use dispatch_core::types::{DbId, Timestamp};
use sqlx::PgExecutor;

use crate::models::professional::{CreateProfessional, Professional, UpdateProfessional};

/// Column list for `professionals` queries.
const COLUMNS: &str = "\
    id, display_name, base_lat, base_lng, service_radius_km, service_categories, \
    is_active, is_verified, rating, created_at, updated_at";

/// Kilometres per degree of latitude, used for the coarse prefilter.
const KM_PER_LAT_DEGREE: f64 = 111.0;

fn normalize_categories(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = raw.iter().filter_map(|c| normalize_category(c).ok()).collect();
    out.sort();
    out.dedup();
    out
}

/// Provides CRUD and candidate lookup for professional profiles.
pub struct ProfessionalRepo;

impl ProfessionalRepo {
    /// Insert a profile, returning the created row.
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        input: &CreateProfessional,
    ) -> Result<Professional, sqlx::Error> {
        let query = format!(
            "INSERT INTO professionals \
                 (display_name, base_lat, base_lng, service_radius_km, service_categories, \
                  is_active, is_verified, rating) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, true), COALESCE($7, false), $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Professional>(&query)
            .bind(&input.display_name)
            .bind(input.base_location.lat)
            .bind(input.base_location.lng)
            .bind(input.service_radius_km)
            .bind(normalize_categories(&input.service_categories))
            .bind(input.is_active)
            .bind(input.is_verified)
            .bind(input.rating)
            .fetch_one(executor)
            .await
    }

    /// Find a profile by its ID.
    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
    ) -> Result<Option<Professional>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM professionals WHERE id = $1");
        sqlx::query_as::<_, Professional>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Update a profile. Only non-`None` fields are applied.
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: DbId,
        input: &UpdateProfessional,
        now: Timestamp,
    ) -> Result<Option<Professional>, sqlx::Error> {
        let query = format!(
            "UPDATE professionals SET \
                 display_name = COALESCE($2, display_name), \
                 base_lat = COALESCE($3, base_lat), \
                 base_lng = COALESCE($4, base_lng), \
                 service_radius_km = COALESCE($5, service_radius_km), \
                 service_categories = COALESCE($6, service_categories), \
                 is_active = COALESCE($7, is_active), \
                 is_verified = COALESCE($8, is_verified), \
                 rating = COALESCE($9, rating), \
                 updated_at = $10 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Professional>(&query)
            .bind(id)
            .bind(&input.display_name)
            .bind(input.base_location.map(|p| p.lat))
            .bind(input.base_location.map(|p| p.lng))
            .bind(input.service_radius_km)
            .bind(input.service_categories.as_deref().map(normalize_categories))
            .bind(input.is_active)
            .bind(input.is_verified)
            .bind(input.rating)
            .bind(now)
            .fetch_optional(executor)
            .await
    }

    /// Profiles offering `category` whose base lies in the latitude band
    /// around `center_lat` that a `radius_km` circle can touch.
    ///
    /// This is a prefilter only; the eligibility evaluator decides.
    pub async fn list_candidates<'e, E: PgExecutor<'e>>(
        executor: E,
        category: &str,
        center_lat: f64,
        radius_km: f64,
    ) -> Result<Vec<Professional>, sqlx::Error> {
        let delta = radius_km / KM_PER_LAT_DEGREE;
        let query = format!(
            "SELECT {COLUMNS} FROM professionals \
             WHERE $1 = ANY(service_categories) \
               AND base_lat BETWEEN $2 AND $3 \
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, Professional>(&query)
            .bind(category)
            .bind(center_lat - delta)
            .bind(center_lat + delta)
            .fetch_all(executor)
            .await
    }
}
