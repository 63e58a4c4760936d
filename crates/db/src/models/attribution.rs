//! Attribution record: one dispatch generation for a booking.

use dispatch_core::booking::BookingSnapshot;
use dispatch_core::geo::GeoPoint;
use dispatch_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::{AttributionStatus, StatusId};

/// A row from the `attributions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attribution {
    pub id: DbId,
    pub booking_id: DbId,
    pub customer_id: Option<DbId>,
    pub generation: i32,
    pub previous_attribution_id: Option<DbId>,
    pub status_id: StatusId,
    pub service_category: String,
    pub service_lat: f64,
    pub service_lng: f64,
    pub scheduled_at: Timestamp,
    pub amount_cents: i64,
    pub max_distance_km: f64,
    pub accepted_professional_id: Option<DbId>,
    pub cancelled_professional_id: Option<DbId>,
    pub broadcast_count: i32,
    pub eligible_count: i32,
    pub created_at: Timestamp,
    pub last_broadcast_at: Timestamp,
    pub accepted_at: Option<Timestamp>,
    pub closed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl Attribution {
    pub fn status(&self) -> Option<AttributionStatus> {
        AttributionStatus::from_id(self.status_id)
    }

    pub fn is_status(&self, status: AttributionStatus) -> bool {
        self.status_id == status.id()
    }

    /// Rebuild the booking snapshot this generation was dispatched for.
    pub fn booking_snapshot(&self) -> BookingSnapshot {
        BookingSnapshot {
            booking_id: self.booking_id,
            customer_id: self.customer_id,
            service_category: self.service_category.clone(),
            location: GeoPoint {
                lat: self.service_lat,
                lng: self.service_lng,
            },
            scheduled_at: self.scheduled_at,
            amount_cents: self.amount_cents,
        }
    }
}

/// Insert parameters for a new generation.
#[derive(Debug, Clone)]
pub struct NewAttribution<'a> {
    pub booking: &'a BookingSnapshot,
    pub generation: i32,
    pub previous_attribution_id: Option<DbId>,
    pub max_distance_km: f64,
    pub now: Timestamp,
}

/// API view of an attribution with its status name resolved.
#[derive(Debug, Clone, Serialize)]
pub struct AttributionView {
    #[serde(flatten)]
    pub attribution: Attribution,
    pub status: &'static str,
}

impl From<Attribution> for AttributionView {
    fn from(attribution: Attribution) -> Self {
        let status = dispatch_core::attribution::state_machine::status_name(attribution.status_id);
        Self {
            attribution,
            status,
        }
    }
}
