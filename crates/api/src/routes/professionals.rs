//! Route definitions for the `/professionals` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::professionals;
use crate::state::AppState;

/// Routes mounted at `/professionals`.
///
/// ```text
/// POST /        -> create
/// GET  /{id}    -> get_by_id
/// PUT  /{id}    -> update
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(professionals::create))
        .route(
            "/{id}",
            get(professionals::get_by_id).put(professionals::update),
        )
}
