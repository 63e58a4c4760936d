//! Route definitions for dispatch administration.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// GET    /blacklist              -> list_blacklist   (?professional_id=)
/// POST   /blacklist              -> create_blacklist
/// POST   /blacklist/{id}/clear   -> clear_blacklist
/// DELETE /updates/stale          -> delete_stale_updates (?older_than=)
/// POST   /scheduler/run          -> run_scheduler
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/blacklist",
            get(admin::list_blacklist).post(admin::create_blacklist),
        )
        .route("/blacklist/{id}/clear", post(admin::clear_blacklist))
        .route("/updates/stale", delete(admin::delete_stale_updates))
        .route("/scheduler/run", post(admin::run_scheduler))
}
