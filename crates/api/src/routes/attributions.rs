//! Route definitions for the `/attributions` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::attributions;
use crate::state::AppState;

/// Routes mounted at `/attributions`.
///
/// ```text
/// GET  /{id}                      -> get_by_id
/// GET  /{id}/eligibility          -> list_eligibility
/// GET  /{id}/responses            -> list_responses
/// GET  /{id}/chain                -> chain
/// POST /{id}/accept               -> accept
/// POST /{id}/decline              -> decline
/// POST /{id}/cancel-acceptance    -> cancel_acceptance
/// POST /{id}/complete             -> complete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(attributions::get_by_id))
        .route("/{id}/eligibility", get(attributions::list_eligibility))
        .route("/{id}/responses", get(attributions::list_responses))
        .route("/{id}/chain", get(attributions::chain))
        .route("/{id}/accept", post(attributions::accept))
        .route("/{id}/decline", post(attributions::decline))
        .route("/{id}/cancel-acceptance", post(attributions::cancel_acceptance))
        .route("/{id}/complete", post(attributions::complete))
}
