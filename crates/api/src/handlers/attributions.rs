//! Handlers for the `/attributions` resource.
//!
//! Reads go straight to the repositories; every state change goes through
//! the dispatch engine.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use dispatch_core::error::CoreError;
use dispatch_core::types::DbId;
use dispatch_db::models::attribution::{Attribution, AttributionView};
use dispatch_db::models::eligibility::EligibilityEntry;
use dispatch_db::models::response::ResponseEntry;
use dispatch_db::repositories::{AttributionRepo, EligibilityRepo, ResponseRepo};
use dispatch_engine::{AcceptOutcome, CancellationOutcome};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of accept and decline requests.
#[derive(Debug, Deserialize)]
pub struct ProfessionalAction {
    pub professional_id: DbId,
}

/// Body of a cancellation response.
#[derive(Debug, Serialize)]
pub struct CancellationResponse {
    pub cancelled: AttributionView,
    pub next: AttributionView,
    pub blacklist_entry: dispatch_db::models::blacklist::BlacklistEntry,
}

impl From<CancellationOutcome> for CancellationResponse {
    fn from(outcome: CancellationOutcome) -> Self {
        Self {
            cancelled: outcome.cancelled.into(),
            next: outcome.next.into(),
            blacklist_entry: outcome.blacklist_entry,
        }
    }
}

async fn ensure_exists(state: &AppState, id: DbId) -> AppResult<Attribution> {
    AttributionRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "attribution",
                id,
            }
            .into()
        })
}

/// GET /api/v1/attributions/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AttributionView>>> {
    let attribution = ensure_exists(&state, id).await?;
    Ok(Json(DataResponse {
        data: attribution.into(),
    }))
}

/// GET /api/v1/attributions/{id}/eligibility
///
/// The professionals notified for this generation, nearest first.
pub async fn list_eligibility(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<EligibilityEntry>>>> {
    ensure_exists(&state, id).await?;
    let entries = EligibilityRepo::list_for_attribution(&state.pool, id).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /api/v1/attributions/{id}/responses
pub async fn list_responses(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ResponseEntry>>>> {
    ensure_exists(&state, id).await?;
    let responses = ResponseRepo::list_for_attribution(&state.pool, id).await?;
    Ok(Json(DataResponse { data: responses }))
}

/// GET /api/v1/attributions/{id}/chain
///
/// Every generation dispatched for the same booking, oldest first.
pub async fn chain(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<AttributionView>>>> {
    let attribution = ensure_exists(&state, id).await?;
    let generations = AttributionRepo::list_for_booking(&state.pool, attribution.booking_id).await?;
    Ok(Json(DataResponse {
        data: generations.into_iter().map(AttributionView::from).collect(),
    }))
}

/// POST /api/v1/attributions/{id}/accept
///
/// Always 200 for a resolved race; losers get `won: false` with the
/// outcome that beat them.
pub async fn accept(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ProfessionalAction>,
) -> AppResult<Json<DataResponse<AcceptOutcome>>> {
    let outcome = state
        .engine
        .arbitrator()
        .attempt_accept(id, input.professional_id, Utc::now())
        .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/attributions/{id}/decline
pub async fn decline(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<ProfessionalAction>,
) -> AppResult<Json<DataResponse<ResponseEntry>>> {
    let entry = state
        .engine
        .arbitrator()
        .decline(id, input.professional_id, Utc::now())
        .await?;
    Ok(Json(DataResponse { data: entry }))
}

/// POST /api/v1/attributions/{id}/cancel-acceptance
///
/// Cancels the accepted generation, blacklists the professional, and
/// returns the new broadcasting generation alongside the cancelled one.
pub async fn cancel_acceptance(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CancellationResponse>>> {
    let outcome = state
        .engine
        .scheduler()
        .cancel_acceptance(id, Utc::now())
        .await?;
    Ok(Json(DataResponse {
        data: outcome.into(),
    }))
}

/// POST /api/v1/attributions/{id}/complete
pub async fn complete(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AttributionView>>> {
    let done = state.engine.arbitrator().complete(id, Utc::now()).await?;
    Ok(Json(DataResponse { data: done.into() }))
}
