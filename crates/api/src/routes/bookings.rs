//! Route definitions for inbound booking signals.

use axum::routing::post;
use axum::Router;

use crate::handlers::bookings;
use crate::state::AppState;

/// Routes mounted at `/bookings`.
///
/// ```text
/// POST /confirmed    -> booking_confirmed
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/confirmed", post(bookings::booking_confirmed))
}
