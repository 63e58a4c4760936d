//! Shared harness for API integration tests.
//!
//! Requests go through the production router and middleware stack via
//! `tower::ServiceExt::oneshot`; no listener is bound.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use dispatch_core::config::DispatchConfig;
use dispatch_core::types::DbId;
use dispatch_engine::DispatchEngine;
use dispatch_events::EventBus;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

use dispatch_api::config::ServerConfig;
use dispatch_api::router::build_app_router;
use dispatch_api::state::AppState;

/// Kilometres per degree of latitude on the evaluator's sphere.
const KM_PER_DEGREE: f64 = 111.195;

pub const BOOKING_LAT: f64 = 48.85;
pub const BOOKING_LNG: f64 = 2.35;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        database_url: String::new(),
    }
}

/// Build the full application router over `pool` with the default
/// dispatch configuration.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, DispatchConfig::default())
}

pub fn build_test_app_with(pool: PgPool, dispatch_config: DispatchConfig) -> Router {
    let config = test_config();
    let event_bus = Arc::new(EventBus::default());
    let engine = DispatchEngine::new(pool.clone(), dispatch_config, Arc::clone(&event_bus))
        .expect("default dispatch config is valid");

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        engine,
        event_bus,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri, None).await
}

pub async fn put_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, None).await
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

/// Read and parse a response body as JSON.
pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the parsed body.
pub async fn expect_status(response: Response<Body>, status: StatusCode) -> Value {
    let actual = response.status();
    let json = body_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {json}");
    json
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Create a verified, active professional `km_north` kilometres north of the
/// booking location through the API; returns its id.
pub async fn create_professional(app: &Router, name: &str, category: &str, km_north: f64) -> DbId {
    let response = post_json(
        app.clone(),
        "/api/v1/professionals",
        json!({
            "display_name": name,
            "base_location": {
                "lat": BOOKING_LAT + km_north / KM_PER_DEGREE,
                "lng": BOOKING_LNG,
            },
            "service_categories": [category],
            "is_active": true,
            "is_verified": true,
            "rating": 4.7,
        }),
    )
    .await;
    let json = expect_status(response, StatusCode::CREATED).await;
    json["data"]["id"].as_i64().unwrap()
}

pub fn booking_body(booking_id: DbId, category: &str) -> Value {
    json!({
        "booking_id": booking_id,
        "service_category": category,
        "location": { "lat": BOOKING_LAT, "lng": BOOKING_LNG },
        "scheduled_at": Utc::now() + Duration::days(2),
        "amount_cents": 12_000,
        "customer_id": 900 + booking_id,
    })
}

/// Confirm a booking and return the new attribution's id.
pub async fn confirm_booking(app: &Router, booking_id: DbId, category: &str) -> DbId {
    let response = post_json(
        app.clone(),
        "/api/v1/bookings/confirmed",
        booking_body(booking_id, category),
    )
    .await;
    let json = expect_status(response, StatusCode::CREATED).await;
    json["data"]["attribution"]["id"].as_i64().unwrap()
}

pub async fn accept(app: &Router, attribution_id: DbId, professional_id: DbId) -> Response<Body> {
    post_json(
        app.clone(),
        &format!("/api/v1/attributions/{attribution_id}/accept"),
        json!({ "professional_id": professional_id }),
    )
    .await
}

/// Poll updates for a professional and return the `data` array.
pub async fn poll_professional(app: &Router, professional_id: DbId) -> Vec<Value> {
    let response = get(
        app.clone(),
        &format!("/api/v1/updates?recipient_id={professional_id}"),
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;
    json["data"].as_array().unwrap().clone()
}

pub fn update_types(updates: &[Value]) -> Vec<String> {
    updates
        .iter()
        .map(|u| u["type"].as_str().unwrap().to_string())
        .collect()
}
