use axum::http::{StatusCode, header::AUTHORIZATION};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use slotbook_core::models::user::Role;
use uuid::Uuid;

use crate::test_utils::{TestContext, bearer};

#[tokio::test]
async fn test_list_slots_is_public() {
    let ctx = TestContext::new();

    let response = ctx.server.get("/api/slots").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!([]));

    let staff = ctx.caller(Role::Staff).await;
    ctx.slot(&staff, 2).await;

    let slots = ctx.server.get("/api/slots").await.json::<Value>();
    assert_eq!(slots.as_array().map(Vec::len), Some(1));
    assert_eq!(slots[0]["current_bookings"], 0);
    assert_eq!(slots[0]["max_bookings"], 2);
    assert_eq!(slots[0]["owner"]["id"], json!(staff.user_id));
}

#[tokio::test]
async fn test_create_slot_defaults_capacity() {
    let ctx = TestContext::new();
    let staff = ctx.caller(Role::Staff).await;

    let response = ctx
        .server
        .post("/api/slots")
        .add_header(AUTHORIZATION, bearer(&staff))
        .json(&json!({
            "title": "Thesis check-in",
            "date": "2025-04-01",
            "start_time": "13:00",
            "end_time": "13:30"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body = response.json::<Value>();
    assert_eq!(body["max_bookings"], 1);
    assert_eq!(body["owner_id"], json!(staff.user_id));
    assert_eq!(body["title"], "Thesis check-in");
}

#[tokio::test]
async fn test_create_slot_requires_token() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/api/slots")
        .json(&json!({ "title": "x", "date": "d", "start_time": "s", "end_time": "e" }))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_student_cannot_create_slot() {
    let ctx = TestContext::new();
    let student = ctx.caller(Role::Student).await;

    let response = ctx
        .server
        .post("/api/slots")
        .add_header(AUTHORIZATION, bearer(&student))
        .json(&json!({ "title": "x", "date": "d", "start_time": "s", "end_time": "e" }))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_student_with_malformed_body_is_forbidden() {
    let ctx = TestContext::new();
    let student = ctx.caller(Role::Student).await;

    let response = ctx
        .server
        .post("/api/slots")
        .add_header(AUTHORIZATION, bearer(&student))
        .text("title=x")
        .expect_failure()
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let error = response.json::<Value>()["error"].as_str().map(str::to_owned);
    assert!(error.is_some_and(|e| e.starts_with("Authorization error:")));
}

#[tokio::test]
async fn test_create_slot_rejects_bad_payloads() {
    let ctx = TestContext::new();
    let staff = ctx.caller(Role::Staff).await;

    let missing_title = ctx
        .server
        .post("/api/slots")
        .add_header(AUTHORIZATION, bearer(&staff))
        .json(&json!({ "title": " ", "date": "d", "start_time": "s", "end_time": "e" }))
        .expect_failure()
        .await;
    missing_title.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        missing_title.json::<Value>()["error"],
        "Validation error: title is required"
    );

    let zero_capacity = ctx
        .server
        .post("/api/slots")
        .add_header(AUTHORIZATION, bearer(&staff))
        .json(&json!({
            "title": "x", "date": "d", "start_time": "s", "end_time": "e", "max_bookings": 0
        }))
        .expect_failure()
        .await;
    zero_capacity.assert_status(StatusCode::BAD_REQUEST);

    let not_json = ctx
        .server
        .post("/api/slots")
        .add_header(AUTHORIZATION, bearer(&staff))
        .text("title=x")
        .expect_failure()
        .await;
    not_json.assert_status(StatusCode::BAD_REQUEST);
    assert!(not_json.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn test_get_unknown_slot_is_not_found() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .get(&format!("/api/slots/{}", Uuid::new_v4()))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_staff_cannot_delete_foreign_slot() {
    let ctx = TestContext::new();
    let owner = ctx.caller(Role::Staff).await;
    let other = ctx.caller(Role::Staff).await;
    let student = ctx.caller(Role::Student).await;
    let slot_id = ctx.slot(&owner, 2).await;
    ctx.book(&student, slot_id).await;

    let response = ctx
        .server
        .delete(&format!("/api/slots/{}", slot_id))
        .add_header(AUTHORIZATION, bearer(&other))
        .expect_failure()
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let slot = ctx
        .server
        .get(&format!("/api/slots/{}", slot_id))
        .await
        .json::<Value>();
    assert_eq!(slot["current_bookings"], 1);
}

#[tokio::test]
async fn test_owner_deletes_slot_with_bookings() {
    let ctx = TestContext::new();
    let owner = ctx.caller(Role::Staff).await;
    let slot_id = ctx.slot(&owner, 3).await;
    for _ in 0..2 {
        let student = ctx.caller(Role::Student).await;
        ctx.book(&student, slot_id).await;
    }

    let response = ctx
        .server
        .delete(&format!("/api/slots/{}", slot_id))
        .add_header(AUTHORIZATION, bearer(&owner))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({ "id": slot_id, "appointments_removed": 2 })
    );

    let admin = ctx.caller(Role::Admin).await;
    let remaining = ctx
        .server
        .get("/api/appointments")
        .add_header(AUTHORIZATION, bearer(&admin))
        .await
        .json::<Value>();
    assert_eq!(remaining, json!([]));
}
