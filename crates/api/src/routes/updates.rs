//! Route definitions for the update polling surface.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::updates;
use crate::state::AppState;

/// Routes mounted at `/updates`.
///
/// ```text
/// GET  /               -> poll          (?recipient_id=&recipient_type=&since=&limit=)
/// POST /acknowledge    -> acknowledge
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(updates::poll))
        .route("/acknowledge", post(updates::acknowledge))
}
