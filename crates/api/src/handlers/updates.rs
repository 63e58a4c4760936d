//! Handlers for the update polling surface.
//!
//! Professionals and clients pull their pending updates and acknowledge
//! what they processed. Nothing is pushed from here.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use dispatch_core::error::CoreError;
use dispatch_core::updates::RecipientType;
use dispatch_db::models::update::{AcknowledgeRequest, PollQuery, PolledUpdate};
use dispatch_engine::PollRequest;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of an acknowledge response.
#[derive(Debug, Serialize)]
pub struct AcknowledgeResponse {
    /// Rows this call newly acknowledged. Repeats and unknown ids count zero.
    pub acknowledged: u64,
}

/// GET /api/v1/updates?recipient_id=&recipient_type=&since=&limit=
///
/// Unacknowledged, unexpired updates for one recipient, oldest first.
pub async fn poll(
    State(state): State<AppState>,
    Query(params): Query<PollQuery>,
) -> AppResult<Json<DataResponse<Vec<PolledUpdate>>>> {
    let recipient_type = params
        .recipient_type
        .as_deref()
        .map(RecipientType::parse)
        .transpose()?
        .unwrap_or_default();

    let request = PollRequest {
        recipient_type,
        recipient_id: params.recipient_id,
        since: params.since,
        limit: params.limit,
    };
    let updates = state.engine.ledger().poll(&request, Utc::now()).await?;
    Ok(Json(DataResponse { data: updates }))
}

/// POST /api/v1/updates/acknowledge
///
/// Idempotent. When `recipient_id` is given only that recipient's rows are
/// touched; `recipient_type` defaults to `professional`.
pub async fn acknowledge(
    State(state): State<AppState>,
    Json(input): Json<AcknowledgeRequest>,
) -> AppResult<Json<DataResponse<AcknowledgeResponse>>> {
    let recipient = match (input.recipient_type.as_deref(), input.recipient_id) {
        (_, None) if input.recipient_type.is_some() => {
            return Err(CoreError::Validation(
                "recipient_type requires recipient_id".into(),
            )
            .into());
        }
        (_, None) => None,
        (raw_type, Some(id)) => {
            let kind = raw_type
                .map(RecipientType::parse)
                .transpose()?
                .unwrap_or_default();
            Some((kind, id))
        }
    };

    let acknowledged = state
        .engine
        .ledger()
        .acknowledge(&input.ids, recipient, Utc::now())
        .await?;
    Ok(Json(DataResponse {
        data: AcknowledgeResponse { acknowledged },
    }))
}
