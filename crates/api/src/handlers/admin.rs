//! Handlers for dispatch administration: manual blacklist entries, outbox
//! cleanup and a manual scheduler pass.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use dispatch_core::blacklist::BlacklistReason;
use dispatch_core::error::CoreError;
use dispatch_core::types::DbId;
use dispatch_db::models::blacklist::{BlacklistEntry, BlacklistListQuery, CreateManualBlacklist};
use dispatch_db::repositories::{BlacklistRepo, NewBlacklistEntry, ProfessionalRepo};
use dispatch_engine::ScanReport;
use serde::Serialize;

use crate::error::AppResult;
use crate::query::OlderThanParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Body of the stale-update cleanup response.
#[derive(Debug, Serialize)]
pub struct DeletedCount {
    pub deleted: u64,
}

/// GET /api/v1/admin/blacklist?professional_id=
///
/// Entries in force now, optionally for one professional.
pub async fn list_blacklist(
    State(state): State<AppState>,
    Query(params): Query<BlacklistListQuery>,
) -> AppResult<Json<DataResponse<Vec<BlacklistEntry>>>> {
    let entries =
        BlacklistRepo::list_active(&state.pool, params.professional_id, Utc::now()).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/admin/blacklist
///
/// Manual entry. Without `expires_at` it stays in force until cleared.
pub async fn create_blacklist(
    State(state): State<AppState>,
    Json(input): Json<CreateManualBlacklist>,
) -> AppResult<(StatusCode, Json<DataResponse<BlacklistEntry>>)> {
    let now = Utc::now();
    if let Some(expires_at) = input.expires_at {
        if expires_at <= now {
            return Err(
                CoreError::Validation("expires_at must be in the future".into()).into(),
            );
        }
    }
    ProfessionalRepo::find_by_id(&state.pool, input.professional_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "professional",
            id: input.professional_id,
        })?;

    let entry = BlacklistRepo::create(
        &state.pool,
        &NewBlacklistEntry {
            professional_id: input.professional_id,
            reason: BlacklistReason::Manual,
            attribution_id: None,
            note: input.note.as_deref(),
            expires_at: input.expires_at,
            now,
        },
    )
    .await?;

    tracing::info!(
        blacklist_id = entry.id,
        professional_id = entry.professional_id,
        "Manual blacklist entry created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// POST /api/v1/admin/blacklist/{id}/clear
///
/// 404 when the entry does not exist or was already cleared.
pub async fn clear_blacklist(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BlacklistEntry>>> {
    let entry = BlacklistRepo::clear(&state.pool, id, Utc::now())
        .await?
        .ok_or(CoreError::NotFound {
            entity: "blacklist entry",
            id,
        })?;
    tracing::info!(
        blacklist_id = id,
        professional_id = entry.professional_id,
        "Blacklist entry cleared",
    );
    Ok(Json(DataResponse { data: entry }))
}

/// DELETE /api/v1/admin/updates/stale?older_than=
///
/// Removes updates acknowledged before `older_than` and every update past
/// its TTL. Without `older_than` the configured retention window applies.
pub async fn delete_stale_updates(
    State(state): State<AppState>,
    Query(params): Query<OlderThanParams>,
) -> AppResult<Json<DataResponse<DeletedCount>>> {
    let ledger = state.engine.ledger();
    let now = Utc::now();
    let deleted = match params.older_than {
        Some(older_than) => ledger.delete_stale(older_than, now).await?,
        None => ledger.reap(now).await?,
    };
    tracing::info!(deleted, "Stale updates deleted");
    Ok(Json(DataResponse {
        data: DeletedCount { deleted },
    }))
}

/// POST /api/v1/admin/scheduler/run
///
/// One scheduler pass, the same code path as the worker's tick.
pub async fn run_scheduler(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<ScanReport>>> {
    let report = state.engine.scheduler().run_once(Utc::now()).await?;
    Ok(Json(DataResponse { data: report }))
}
