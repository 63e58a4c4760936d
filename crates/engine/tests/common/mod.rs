//! Shared fixtures for engine integration tests.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use dispatch_core::blacklist::BlacklistReason;
use dispatch_core::booking::BookingConfirmed;
use dispatch_core::config::DispatchConfig;
use dispatch_core::geo::GeoPoint;
use dispatch_core::types::{DbId, Timestamp};
use dispatch_db::models::professional::CreateProfessional;
use dispatch_db::repositories::{BlacklistRepo, NewBlacklistEntry, ProfessionalRepo};
use dispatch_engine::DispatchEngine;
use dispatch_events::EventBus;
use sqlx::PgPool;

/// Kilometres per degree of latitude on the evaluator's sphere.
const KM_PER_DEGREE: f64 = 111.195;

pub const BOOKING_LAT: f64 = 48.85;
pub const BOOKING_LNG: f64 = 2.35;

pub fn t0() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

pub fn engine(pool: &PgPool) -> DispatchEngine {
    engine_with(pool, DispatchConfig::default())
}

pub fn engine_with(pool: &PgPool, config: DispatchConfig) -> DispatchEngine {
    DispatchEngine::new(pool.clone(), config, Arc::new(EventBus::default())).unwrap()
}

pub fn booking(booking_id: DbId, category: &str) -> BookingConfirmed {
    BookingConfirmed {
        booking_id,
        service_category: category.to_string(),
        location: GeoPoint {
            lat: BOOKING_LAT,
            lng: BOOKING_LNG,
        },
        scheduled_at: t0() + Duration::days(2),
        amount_cents: 15_000,
        customer_id: Some(500 + booking_id),
    }
}

/// A verified, active professional `km_north` kilometres due north of the
/// booking location, with no service-area limit of their own.
pub async fn professional_at(pool: &PgPool, name: &str, category: &str, km_north: f64) -> DbId {
    ProfessionalRepo::create(
        pool,
        &CreateProfessional {
            display_name: name.to_string(),
            base_location: GeoPoint {
                lat: BOOKING_LAT + km_north / KM_PER_DEGREE,
                lng: BOOKING_LNG,
            },
            service_radius_km: None,
            service_categories: vec![category.to_string()],
            is_active: Some(true),
            is_verified: Some(true),
            rating: Some(4.8),
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn blacklist(pool: &PgPool, professional_id: DbId, until: Timestamp) {
    BlacklistRepo::create(
        pool,
        &NewBlacklistEntry {
            professional_id,
            reason: BlacklistReason::Manual,
            attribution_id: None,
            note: Some("test"),
            expires_at: Some(until),
            now: t0(),
        },
    )
    .await
    .unwrap();
}
