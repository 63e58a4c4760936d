//! HTTP-level integration tests for the dispatch flow: booking signals,
//! accept/decline races, cancellation, completion and update polling.

mod common;

use assert_matches::assert_matches;
use axum::http::StatusCode;
use common::{
    accept, booking_body, build_test_app, confirm_booking, create_professional, expect_status,
    get, poll_professional, post_empty, post_json, update_types,
};
use serde_json::json;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// BookingConfirmed
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn booking_confirmed_broadcasts_to_nearby_professionals(pool: PgPool) {
    let app = build_test_app(pool);
    let near = create_professional(&app, "Near", "plumbing", 3.0).await;
    let far = create_professional(&app, "Far", "plumbing", 12.0).await;
    create_professional(&app, "Electrician", "electrical", 1.0).await;
    create_professional(&app, "Too far", "plumbing", 60.0).await;

    let response = post_json(
        app.clone(),
        "/api/v1/bookings/confirmed",
        booking_body(1, "plumbing"),
    )
    .await;
    let json = expect_status(response, StatusCode::CREATED).await;

    let attribution = &json["data"]["attribution"];
    assert_eq!(attribution["status"], "broadcasting");
    assert_eq!(attribution["broadcast_count"], 1);
    assert_eq!(attribution["eligible_count"], 2);
    assert_eq!(attribution["generation"], 1);
    assert_eq!(json["data"]["created"], true);

    let eligible: Vec<i64> = json["data"]["eligible"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["professional_id"].as_i64().unwrap())
        .collect();
    assert_eq!(eligible, vec![near, far], "nearest first");

    let id = attribution["id"].as_i64().unwrap();
    let snapshot = expect_status(
        get(app.clone(), &format!("/api/v1/attributions/{id}/eligibility")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(snapshot["data"].as_array().unwrap().len(), 2);

    assert_eq!(update_types(&poll_professional(&app, near).await), vec!["new_opportunity"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_booking_signal_returns_live_generation(pool: PgPool) {
    let app = build_test_app(pool);
    create_professional(&app, "Ana", "plumbing", 2.0).await;
    let first = confirm_booking(&app, 2, "plumbing").await;

    let response = post_json(
        app.clone(),
        "/api/v1/bookings/confirmed",
        booking_body(2, "plumbing"),
    )
    .await;
    let json = expect_status(response, StatusCode::OK).await;

    assert_eq!(json["data"]["attribution"]["id"], first);
    assert_eq!(json["data"]["created"], false);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn invalid_booking_location_is_rejected(pool: PgPool) {
    let app = build_test_app(pool);
    let mut body = booking_body(3, "plumbing");
    body["location"]["lat"] = json!(123.0);

    let json = expect_status(
        post_json(app.clone(), "/api/v1/bookings/confirmed", body).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn booking_with_no_candidates_still_creates_attribution(pool: PgPool) {
    let app = build_test_app(pool);

    let json = expect_status(
        post_json(
            app.clone(),
            "/api/v1/bookings/confirmed",
            booking_body(4, "roofing"),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;

    assert_eq!(json["data"]["attribution"]["eligible_count"], 0);
    assert_eq!(json["data"]["attribution"]["status"], "broadcasting");
}

// ---------------------------------------------------------------------------
// Accept / decline
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn first_accept_wins_and_loser_sees_already_taken(pool: PgPool) {
    let app = build_test_app(pool);
    let winner = create_professional(&app, "Winner", "plumbing", 1.0).await;
    let loser = create_professional(&app, "Loser", "plumbing", 2.0).await;
    let id = confirm_booking(&app, 10, "plumbing").await;

    let won = expect_status(accept(&app, id, winner).await, StatusCode::OK).await;
    assert_eq!(won["data"]["won"], true);
    assert_eq!(won["data"]["outcome"], "won");
    assert_eq!(won["data"]["status"], "accepted");

    let lost = expect_status(accept(&app, id, loser).await, StatusCode::OK).await;
    assert_eq!(lost["data"]["won"], false);
    assert_eq!(lost["data"]["outcome"], "already_taken");

    let record = expect_status(
        get(app.clone(), &format!("/api/v1/attributions/{id}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(record["data"]["accepted_professional_id"], winner);

    let loser_updates = update_types(&poll_professional(&app, loser).await);
    assert!(loser_updates.contains(&"job_taken".to_string()));
    let winner_updates = update_types(&poll_professional(&app, winner).await);
    assert!(winner_updates.contains(&"accepted_confirmation".to_string()));

    let client = expect_status(
        get(
            app.clone(),
            "/api/v1/updates?recipient_id=910&recipient_type=client",
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(update_types(client["data"].as_array().unwrap()), vec!["professional_assigned"]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn winner_retry_reports_won_again(pool: PgPool) {
    let app = build_test_app(pool);
    let pro = create_professional(&app, "Ana", "plumbing", 1.0).await;
    let id = confirm_booking(&app, 11, "plumbing").await;

    expect_status(accept(&app, id, pro).await, StatusCode::OK).await;
    let retry = expect_status(accept(&app, id, pro).await, StatusCode::OK).await;

    assert_eq!(retry["data"]["won"], true);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn accept_by_non_eligible_professional_is_forbidden(pool: PgPool) {
    let app = build_test_app(pool);
    create_professional(&app, "Eligible", "plumbing", 1.0).await;
    let outsider = create_professional(&app, "Outsider", "electrical", 1.0).await;
    let id = confirm_booking(&app, 12, "plumbing").await;

    let json = expect_status(accept(&app, id, outsider).await, StatusCode::FORBIDDEN).await;
    assert_eq!(json["code"], "FORBIDDEN");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn accept_on_unknown_attribution_returns_404(pool: PgPool) {
    let app = build_test_app(pool);
    let pro = create_professional(&app, "Ana", "plumbing", 1.0).await;

    let json = expect_status(accept(&app, 999_999, pro).await, StatusCode::NOT_FOUND).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn concurrent_accepts_over_http_have_one_winner(pool: PgPool) {
    let app = build_test_app(pool);
    let mut pros = Vec::new();
    for i in 0..8 {
        pros.push(create_professional(&app, &format!("Pro {i}"), "plumbing", 1.0 + i as f64).await);
    }
    let id = confirm_booking(&app, 13, "plumbing").await;

    let handles: Vec<_> = pros
        .iter()
        .map(|&pro| {
            let app = app.clone();
            tokio::spawn(async move { common::body_json(accept(&app, id, pro).await).await })
        })
        .collect();

    let mut winners = 0;
    for handle in handles {
        let json = handle.await.unwrap();
        assert_matches!(json["data"]["won"].as_bool(), Some(_));
        if json["data"]["won"] == true {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn decline_is_logged_without_changing_status(pool: PgPool) {
    let app = build_test_app(pool);
    let pro = create_professional(&app, "Ana", "plumbing", 1.0).await;
    let id = confirm_booking(&app, 14, "plumbing").await;

    let declined = expect_status(
        post_json(
            app.clone(),
            &format!("/api/v1/attributions/{id}/decline"),
            json!({ "professional_id": pro }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(declined["data"]["response"], "declined");

    let record = expect_status(
        get(app.clone(), &format!("/api/v1/attributions/{id}")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(record["data"]["status"], "broadcasting");

    let responses = expect_status(
        get(app.clone(), &format!("/api/v1/attributions/{id}/responses")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(responses["data"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Cancellation and completion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn cancellation_blacklists_and_starts_next_generation(pool: PgPool) {
    let app = build_test_app(pool);
    let canceller = create_professional(&app, "Canceller", "plumbing", 1.0).await;
    let backup = create_professional(&app, "Backup", "plumbing", 2.0).await;
    let id = confirm_booking(&app, 20, "plumbing").await;
    expect_status(accept(&app, id, canceller).await, StatusCode::OK).await;

    let json = expect_status(
        post_empty(
            app.clone(),
            &format!("/api/v1/attributions/{id}/cancel-acceptance"),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    let cancelled = &json["data"]["cancelled"];
    assert_eq!(cancelled["status"], "cancelled");
    assert_eq!(cancelled["accepted_professional_id"], serde_json::Value::Null);
    assert_eq!(cancelled["cancelled_professional_id"], canceller);

    let next = &json["data"]["next"];
    assert_eq!(next["status"], "broadcasting");
    assert_eq!(next["generation"], 2);
    assert_eq!(next["previous_attribution_id"], id);
    assert_eq!(next["eligible_count"], 1);

    assert_eq!(json["data"]["blacklist_entry"]["reason"], "cancellation_after_accept");

    let chain = expect_status(
        get(app.clone(), &format!("/api/v1/attributions/{id}/chain")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(chain["data"].as_array().unwrap().len(), 2);

    let next_id = next["id"].as_i64().unwrap();
    let forbidden = accept(&app, next_id, canceller).await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    let won = expect_status(accept(&app, next_id, backup).await, StatusCode::OK).await;
    assert_eq!(won["data"]["won"], true);

    let blacklist = expect_status(
        get(
            app.clone(),
            &format!("/api/v1/admin/blacklist?professional_id={canceller}"),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(blacklist["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cancel_requires_an_accepted_record(pool: PgPool) {
    let app = build_test_app(pool);
    create_professional(&app, "Ana", "plumbing", 1.0).await;
    let id = confirm_booking(&app, 21, "plumbing").await;

    let json = expect_status(
        post_empty(
            app.clone(),
            &format!("/api/v1/attributions/{id}/cancel-acceptance"),
        )
        .await,
        StatusCode::CONFLICT,
    )
    .await;
    assert_eq!(json["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn completed_record_is_immutable(pool: PgPool) {
    let app = build_test_app(pool);
    let pro = create_professional(&app, "Ana", "plumbing", 1.0).await;
    let id = confirm_booking(&app, 22, "plumbing").await;
    expect_status(accept(&app, id, pro).await, StatusCode::OK).await;

    let done = expect_status(
        post_empty(app.clone(), &format!("/api/v1/attributions/{id}/complete")).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(done["data"]["status"], "completed");

    let again = post_empty(app.clone(), &format!("/api/v1/attributions/{id}/complete")).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);
    let cancel = post_empty(
        app.clone(),
        &format!("/api/v1/attributions/{id}/cancel-acceptance"),
    )
    .await;
    assert_eq!(cancel.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn acknowledged_updates_are_not_polled_again(pool: PgPool) {
    let app = build_test_app(pool);
    let pro = create_professional(&app, "Ana", "plumbing", 1.0).await;
    confirm_booking(&app, 30, "plumbing").await;

    let updates = poll_professional(&app, pro).await;
    assert_eq!(updates.len(), 1);
    let update_id = updates[0]["id"].as_i64().unwrap();
    assert!(updates[0]["attribution_id"].is_i64());
    assert!(updates[0]["timestamp"].is_string());

    let body = json!({ "ids": [update_id], "recipient_id": pro });
    let first = expect_status(
        post_json(app.clone(), "/api/v1/updates/acknowledge", body.clone()).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(first["data"]["acknowledged"], 1);

    let repeat = expect_status(
        post_json(app.clone(), "/api/v1/updates/acknowledge", body).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(repeat["data"]["acknowledged"], 0);

    assert!(poll_professional(&app, pro).await.is_empty());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn acknowledge_scoped_to_another_recipient_touches_nothing(pool: PgPool) {
    let app = build_test_app(pool);
    let pro = create_professional(&app, "Ana", "plumbing", 1.0).await;
    confirm_booking(&app, 31, "plumbing").await;
    let update_id = poll_professional(&app, pro).await[0]["id"].as_i64().unwrap();

    let json = expect_status(
        post_json(
            app.clone(),
            "/api/v1/updates/acknowledge",
            json!({ "ids": [update_id], "recipient_id": pro + 1000 }),
        )
        .await,
        StatusCode::OK,
    )
    .await;

    assert_eq!(json["data"]["acknowledged"], 0);
    assert_eq!(poll_professional(&app, pro).await.len(), 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn oversized_acknowledge_batch_is_rejected(pool: PgPool) {
    let app = build_test_app(pool);
    let ids: Vec<i64> = (1..=501).collect();

    let json = expect_status(
        post_json(app, "/api/v1/updates/acknowledge", json!({ "ids": ids })).await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn poll_rejects_unknown_recipient_type(pool: PgPool) {
    let app = build_test_app(pool);

    let json = expect_status(
        get(app, "/api/v1/updates?recipient_id=1&recipient_type=admin").await,
        StatusCode::BAD_REQUEST,
    )
    .await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn poll_requires_recipient_id(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(app, "/api/v1/updates").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
