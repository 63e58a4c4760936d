pub mod admin;
pub mod attributions;
pub mod bookings;
pub mod health;
pub mod professionals;
pub mod updates;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /bookings/confirmed                              BookingConfirmed (POST)
///
/// /attributions/{id}                               get
/// /attributions/{id}/eligibility                   eligibility snapshot
/// /attributions/{id}/responses                     response log
/// /attributions/{id}/chain                         all generations of the booking
/// /attributions/{id}/accept                        accept attempt (POST)
/// /attributions/{id}/decline                       decline (POST)
/// /attributions/{id}/cancel-acceptance             cancellation after accept (POST)
/// /attributions/{id}/complete                      job completed (POST)
///
/// /updates                                         poll
/// /updates/acknowledge                             acknowledge (POST)
///
/// /professionals                                   create (POST)
/// /professionals/{id}                              get, update
///
/// /admin/blacklist                                 list, create
/// /admin/blacklist/{id}/clear                      clear (POST)
/// /admin/updates/stale                             cleanup (DELETE)
/// /admin/scheduler/run                             one scheduler pass (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/bookings", bookings::router())
        .nest("/attributions", attributions::router())
        .nest("/updates", updates::router())
        .nest("/professionals", professionals::router())
        .nest("/admin", admin::router())
}
