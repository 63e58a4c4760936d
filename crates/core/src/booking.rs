//! Inbound `BookingConfirmed` signal and the booking snapshot the engine
//! dispatches against.
//!
//! Bookings are owned by the booking subsystem. The engine never mutates
//! them; it copies the fields it needs into each attribution generation.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::geo::GeoPoint;
use crate::types::{DbId, Timestamp};

/// Maximum length of a service category code.
pub const MAX_CATEGORY_LEN: usize = 64;

/// `BookingConfirmed(bookingId, serviceCategory, location, scheduledTime)`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookingConfirmed {
    pub booking_id: DbId,
    pub service_category: String,
    pub location: GeoPoint,
    pub scheduled_at: Timestamp,
    /// Monetary amount in minor units (cents).
    #[serde(default)]
    pub amount_cents: i64,
    /// Customer who placed the booking; receives client-side updates.
    #[serde(default)]
    pub customer_id: Option<DbId>,
}

/// Validated, normalized booking data carried by every attribution generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingSnapshot {
    pub booking_id: DbId,
    pub customer_id: Option<DbId>,
    pub service_category: String,
    pub location: GeoPoint,
    pub scheduled_at: Timestamp,
    pub amount_cents: i64,
}

impl BookingConfirmed {
    /// Validate the signal and produce a normalized snapshot.
    ///
    /// Nothing is persisted for a signal that fails here.
    pub fn validate(&self) -> Result<BookingSnapshot, CoreError> {
        if self.booking_id <= 0 {
            return Err(CoreError::Validation(format!(
                "booking_id must be positive, got {}",
                self.booking_id
            )));
        }

        let service_category = normalize_category(&self.service_category)?;
        self.location.validate()?;

        if self.amount_cents < 0 {
            return Err(CoreError::Validation(
                "amount_cents must not be negative".into(),
            ));
        }

        if let Some(customer_id) = self.customer_id {
            if customer_id <= 0 {
                return Err(CoreError::Validation(format!(
                    "customer_id must be positive, got {customer_id}"
                )));
            }
        }

        Ok(BookingSnapshot {
            booking_id: self.booking_id,
            customer_id: self.customer_id,
            service_category,
            location: self.location,
            scheduled_at: self.scheduled_at,
            amount_cents: self.amount_cents,
        })
    }
}

/// Trim and upper-case a category code, rejecting empty or oversized values.
pub fn normalize_category(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "service_category must not be empty".into(),
        ));
    }
    if trimmed.len() > MAX_CATEGORY_LEN {
        return Err(CoreError::Validation(format!(
            "service_category must be at most {MAX_CATEGORY_LEN} characters"
        )));
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CoreError::Validation(format!(
            "service_category '{trimmed}' contains invalid characters"
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}
