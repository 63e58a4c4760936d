//! Handler for the inbound `BookingConfirmed` signal.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use dispatch_core::booking::BookingConfirmed;
use dispatch_core::eligibility::EligibleCandidate;
use dispatch_db::models::attribution::AttributionView;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of a `BookingConfirmed` response.
#[derive(Debug, Serialize)]
pub struct BookingConfirmedResponse {
    pub attribution: AttributionView,
    /// `false` when the signal was a duplicate of one already handled.
    pub created: bool,
    pub eligible: Vec<EligibleCandidate>,
}

/// POST /api/v1/bookings/confirmed
///
/// Validates the booking and broadcasts its first generation. Returns 201
/// for a new generation and 200 when a duplicate signal returned the
/// booking's live generation.
pub async fn booking_confirmed(
    State(state): State<AppState>,
    Json(input): Json<BookingConfirmed>,
) -> AppResult<(StatusCode, Json<DataResponse<BookingConfirmedResponse>>)> {
    let outcome = state
        .engine
        .orchestrator()
        .booking_confirmed(&input, Utc::now())
        .await?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(DataResponse {
            data: BookingConfirmedResponse {
                attribution: outcome.attribution.into(),
                created: outcome.created,
                eligible: outcome.eligible,
            },
        }),
    ))
}
