//! Handlers for the `/professionals` resource.
//!
//! Profiles are the engine's read model of the professional subsystem; the
//! evaluator reads them on every broadcast round.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use dispatch_core::booking::normalize_category;
use dispatch_core::error::CoreError;
use dispatch_core::types::DbId;
use dispatch_db::models::professional::{CreateProfessional, Professional, UpdateProfessional};
use dispatch_db::repositories::ProfessionalRepo;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Upper bound of the rating scale.
const MAX_RATING: f64 = 5.0;

/// POST /api/v1/professionals
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateProfessional>,
) -> AppResult<(StatusCode, Json<DataResponse<Professional>>)> {
    validate_display_name(&input.display_name)?;
    input.base_location.validate()?;
    validate_radius(input.service_radius_km)?;
    validate_categories(&input.service_categories)?;
    validate_rating(input.rating)?;

    let professional = ProfessionalRepo::create(&state.pool, &input).await?;
    tracing::info!(professional_id = professional.id, "Professional profile created");
    Ok((
        StatusCode::CREATED,
        Json(DataResponse { data: professional }),
    ))
}

/// GET /api/v1/professionals/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Professional>>> {
    let professional = ProfessionalRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "professional",
            id,
        })?;
    Ok(Json(DataResponse { data: professional }))
}

/// PUT /api/v1/professionals/{id}
///
/// Absent fields keep their stored value.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProfessional>,
) -> AppResult<Json<DataResponse<Professional>>> {
    if let Some(name) = &input.display_name {
        validate_display_name(name)?;
    }
    if let Some(location) = &input.base_location {
        location.validate()?;
    }
    validate_radius(input.service_radius_km)?;
    if let Some(categories) = &input.service_categories {
        validate_categories(categories)?;
    }
    validate_rating(input.rating)?;

    let professional = ProfessionalRepo::update(&state.pool, id, &input, Utc::now())
        .await?
        .ok_or(CoreError::NotFound {
            entity: "professional",
            id,
        })?;
    tracing::info!(professional_id = id, "Professional profile updated");
    Ok(Json(DataResponse { data: professional }))
}

fn validate_display_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("display_name must not be empty".into()));
    }
    Ok(())
}

fn validate_radius(radius_km: Option<f64>) -> Result<(), CoreError> {
    match radius_km {
        Some(r) if !r.is_finite() || r <= 0.0 => Err(CoreError::Validation(format!(
            "service_radius_km must be positive, got {r}"
        ))),
        _ => Ok(()),
    }
}

fn validate_categories(categories: &[String]) -> Result<(), CoreError> {
    if categories.is_empty() {
        return Err(CoreError::Validation(
            "service_categories must list at least one category".into(),
        ));
    }
    for category in categories {
        normalize_category(category)?;
    }
    Ok(())
}

fn validate_rating(rating: Option<f64>) -> Result<(), CoreError> {
    match rating {
        Some(r) if !(0.0..=MAX_RATING).contains(&r) => Err(CoreError::Validation(format!(
            "rating must be between 0 and {MAX_RATING}, got {r}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_display_name_is_rejected() {
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name("Ana").is_ok());
    }

    #[test]
    fn radius_must_be_positive_when_present() {
        assert!(validate_radius(None).is_ok());
        assert!(validate_radius(Some(5.0)).is_ok());
        assert!(validate_radius(Some(0.0)).is_err());
        assert!(validate_radius(Some(f64::NAN)).is_err());
    }

    #[test]
    fn categories_must_be_non_empty_and_valid() {
        assert!(validate_categories(&[]).is_err());
        assert!(validate_categories(&["  ".to_string()]).is_err());
        assert!(validate_categories(&["plumbing".to_string()]).is_ok());
    }

    #[test]
    fn rating_is_bounded() {
        assert!(validate_rating(Some(4.5)).is_ok());
        assert!(validate_rating(Some(5.5)).is_err());
        assert!(validate_rating(Some(-1.0)).is_err());
    }
}
