//! HTTP-level integration tests for professional profiles and the admin
//! endpoints (manual blacklist, stale update cleanup, scheduler trigger).

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{
    build_test_app, confirm_booking, create_professional, delete, expect_status, get,
    poll_professional, post_empty, post_json, put_json,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Professionals
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn professional_profile_round_trip(pool: PgPool) {
    let app = build_test_app(pool);
    let id = create_professional(&app, "Ana", " plumbing ", 1.0).await;

    let json = expect_status(
        get(app.clone(), &format!("/api/v1/professionals/{id}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["display_name"], "Ana");
    assert_eq!(json["data"]["service_categories"], json!(["PLUMBING"]));

    let updated = expect_status(
        put_json(
            app.clone(),
            &format!("/api/v1/professionals/{id}"),
            json!({ "is_active": false, "service_radius_km": 8.0 }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(updated["data"]["is_active"], false);
    assert_eq!(updated["data"]["service_radius_km"], 8.0);
    assert_eq!(updated["data"]["display_name"], "Ana");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn invalid_professional_is_rejected(pool: PgPool) {
    let app = build_test_app(pool);

    let json = expect_status(
        post_json(
            app,
            "/api/v1/professionals",
            json!({
                "display_name": "Ana",
                "base_location": { "lat": 48.8, "lng": 2.3 },
                "service_categories": [],
            }),
        )
        .await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_professional_returns_404(pool: PgPool) {
    let app = build_test_app(pool);

    let get_response = get(app.clone(), "/api/v1/professionals/424242").await;
    assert_eq!(get_response.status(), StatusCode::NOT_FOUND);

    let put_response = put_json(
        app,
        "/api/v1/professionals/424242",
        json!({ "is_active": true }),
    )
    .await;
    assert_eq!(put_response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn inactive_professional_is_not_broadcast_to(pool: PgPool) {
    let app = build_test_app(pool);
    let id = create_professional(&app, "Ana", "plumbing", 1.0).await;
    expect_status(
        put_json(
            app.clone(),
            &format!("/api/v1/professionals/{id}"),
            json!({ "is_active": false }),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    confirm_booking(&app, 40, "plumbing").await;

    assert!(poll_professional(&app, id).await.is_empty());
}

// ---------------------------------------------------------------------------
// Manual blacklist
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn manual_blacklist_excludes_until_cleared(pool: PgPool) {
    let app = build_test_app(pool);
    let pro = create_professional(&app, "Ana", "plumbing", 1.0).await;

    let created = expect_status(
        post_json(
            app.clone(),
            "/api/v1/admin/blacklist",
            json!({ "professional_id": pro, "note": "repeated complaints" }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    assert_eq!(created["data"]["reason"], "manual");
    assert_eq!(created["data"]["expires_at"], serde_json::Value::Null);
    let entry_id = created["data"]["id"].as_i64().unwrap();

    let listed = expect_status(
        get(app.clone(), "/api/v1/admin/blacklist").await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);

    confirm_booking(&app, 50, "plumbing").await;
    assert!(poll_professional(&app, pro).await.is_empty());

    let cleared = expect_status(
        post_empty(
            app.clone(),
            &format!("/api/v1/admin/blacklist/{entry_id}/clear"),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert!(cleared["data"]["cleared_at"].is_string());

    let again = post_empty(
        app.clone(),
        &format!("/api/v1/admin/blacklist/{entry_id}/clear"),
    )
    .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);

    let listed = expect_status(
        get(app.clone(), "/api/v1/admin/blacklist").await,
        StatusCode::OK,
    )
    .await;
    assert!(listed["data"].as_array().unwrap().is_empty());

    confirm_booking(&app, 51, "plumbing").await;
    assert_eq!(poll_professional(&app, pro).await.len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn manual_blacklist_rejects_past_expiry_and_unknown_professional(pool: PgPool) {
    let app = build_test_app(pool);
    let pro = create_professional(&app, "Ana", "plumbing", 1.0).await;

    let past = post_json(
        app.clone(),
        "/api/v1/admin/blacklist",
        json!({ "professional_id": pro, "expires_at": Utc::now() - Duration::hours(1) }),
    )
    .await;
    assert_eq!(past.status(), StatusCode::BAD_REQUEST);

    let unknown = post_json(
        app,
        "/api/v1/admin/blacklist",
        json!({ "professional_id": 987_654 }),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Cleanup and scheduler
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn stale_cleanup_removes_acknowledged_updates(pool: PgPool) {
    let app = build_test_app(pool);
    let pro = create_professional(&app, "Ana", "plumbing", 1.0).await;
    confirm_booking(&app, 60, "plumbing").await;
    let update_id = poll_professional(&app, pro).await[0]["id"].as_i64().unwrap();
    expect_status(
        post_json(
            app.clone(),
            "/api/v1/updates/acknowledge",
            json!({ "ids": [update_id] }),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    let cutoff = Utc::now();
    let json = expect_status(
        delete(
            app.clone(),
            &format!(
                "/api/v1/admin/updates/stale?older_than={}",
                cutoff.format("%Y-%m-%dT%H:%M:%S%.fZ")
            ),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["deleted"], 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn stale_cleanup_rejects_future_cutoff(pool: PgPool) {
    let app = build_test_app(pool);
    let future = Utc::now() + Duration::days(1);

    let response = delete(
        app,
        &format!(
            "/api/v1/admin/updates/stale?older_than={}",
            future.format("%Y-%m-%dT%H:%M:%SZ")
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn stale_cleanup_without_cutoff_uses_retention(pool: PgPool) {
    let app = build_test_app(pool);

    let json = expect_status(
        delete(app, "/api/v1/admin/updates/stale").await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["deleted"], 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn manual_scheduler_pass_reports_counters(pool: PgPool) {
    let app = build_test_app(pool);
    create_professional(&app, "Ana", "plumbing", 1.0).await;
    confirm_booking(&app, 70, "plumbing").await;

    let json = expect_status(
        post_empty(app, "/api/v1/admin/scheduler/run").await,
        StatusCode::OK,
    )
    .await;

    // Freshly broadcast records are not due yet.
    assert_eq!(json["data"]["scanned"], 0);
    assert_eq!(json["data"]["failed"], 0);
}
