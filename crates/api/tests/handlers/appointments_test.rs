use axum::http::{StatusCode, header::AUTHORIZATION};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use slotbook_core::models::user::Role;

use crate::test_utils::{TestContext, bearer};

#[tokio::test]
async fn test_book_then_book_again_conflicts() {
    let ctx = TestContext::new();
    let staff = ctx.caller(Role::Staff).await;
    let student = ctx.caller(Role::Student).await;
    let slot_id = ctx.slot(&staff, 3).await;

    let first = ctx
        .server
        .post("/api/appointments")
        .add_header(AUTHORIZATION, bearer(&student))
        .json(&json!({ "slot_id": slot_id }))
        .await;
    first.assert_status(StatusCode::CREATED);
    let body = first.json::<Value>();
    assert_eq!(body["status"], "booked");
    assert_eq!(body["student_id"], json!(student.user_id));
    assert_eq!(body["slot"]["current_bookings"], 1);

    let second = ctx
        .server
        .post("/api/appointments")
        .add_header(AUTHORIZATION, bearer(&student))
        .json(&json!({ "slot_id": slot_id }))
        .expect_failure()
        .await;
    second.assert_status(StatusCode::CONFLICT);
    assert_eq!(second.json::<Value>()["error"], "Conflict: already booked");
}

#[tokio::test]
async fn test_full_slot_conflicts() {
    let ctx = TestContext::new();
    let staff = ctx.caller(Role::Staff).await;
    let first = ctx.caller(Role::Student).await;
    let second = ctx.caller(Role::Student).await;
    let slot_id = ctx.slot(&staff, 1).await;
    ctx.book(&first, slot_id).await;

    let response = ctx
        .server
        .post("/api/appointments")
        .add_header(AUTHORIZATION, bearer(&second))
        .json(&json!({ "slot_id": slot_id }))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(response.json::<Value>()["error"], "Conflict: slot full");
}

#[tokio::test]
async fn test_only_students_book() {
    let ctx = TestContext::new();
    let staff = ctx.caller(Role::Staff).await;
    let slot_id = ctx.slot(&staff, 1).await;

    let response = ctx
        .server
        .post("/api/appointments")
        .add_header(AUTHORIZATION, bearer(&staff))
        .json(&json!({ "slot_id": slot_id }))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_book_without_slot_id_is_rejected() {
    let ctx = TestContext::new();
    let student = ctx.caller(Role::Student).await;

    let response = ctx
        .server
        .post("/api/appointments")
        .add_header(AUTHORIZATION, bearer(&student))
        .json(&json!({}))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        "Validation error: slot_id is required"
    );
}

#[tokio::test]
async fn test_cancel_twice() {
    let ctx = TestContext::new();
    let staff = ctx.caller(Role::Staff).await;
    let student = ctx.caller(Role::Student).await;
    let slot_id = ctx.slot(&staff, 1).await;
    let appointment_id = ctx.book(&student, slot_id).await;

    let path = format!("/api/appointments/{}/cancel", appointment_id);

    let first = ctx
        .server
        .patch(&path)
        .add_header(AUTHORIZATION, bearer(&student))
        .await;
    first.assert_status_ok();
    assert_eq!(first.json::<Value>()["status"], "cancelled");

    let second = ctx
        .server
        .patch(&path)
        .add_header(AUTHORIZATION, bearer(&student))
        .expect_failure()
        .await;
    second.assert_status(StatusCode::CONFLICT);
    assert_eq!(second.json::<Value>()["error"], "Conflict: already cancelled");

    // The freed seat can be taken by someone else
    let other = ctx.caller(Role::Student).await;
    ctx.book(&other, slot_id).await;
}

#[tokio::test]
async fn test_admin_assign() {
    let ctx = TestContext::new();
    let admin = ctx.caller(Role::Admin).await;
    let staff = ctx.caller(Role::Staff).await;
    let student = ctx.caller(Role::Student).await;
    let slot_id = ctx.slot(&staff, 1).await;

    let forbidden = ctx
        .server
        .post("/api/appointments/assign")
        .add_header(AUTHORIZATION, bearer(&staff))
        .json(&json!({ "slot_id": slot_id, "student_id": student.user_id }))
        .expect_failure()
        .await;
    forbidden.assert_status(StatusCode::FORBIDDEN);

    let missing_student = ctx
        .server
        .post("/api/appointments/assign")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "slot_id": slot_id }))
        .expect_failure()
        .await;
    missing_student.assert_status(StatusCode::BAD_REQUEST);

    let assigned = ctx
        .server
        .post("/api/appointments/assign")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "slot_id": slot_id, "student_id": student.user_id }))
        .await;
    assigned.assert_status(StatusCode::CREATED);
    assert_eq!(assigned.json::<Value>()["student_id"], json!(student.user_id));
}

#[tokio::test]
async fn test_reassign_collision_keeps_original_student() {
    let ctx = TestContext::new();
    let admin = ctx.caller(Role::Admin).await;
    let staff = ctx.caller(Role::Staff).await;
    let alice = ctx.caller(Role::Student).await;
    let bob = ctx.caller(Role::Student).await;
    let carol = ctx.caller(Role::Student).await;
    let slot_id = ctx.slot(&staff, 3).await;
    let appointment_id = ctx.book(&alice, slot_id).await;
    ctx.book(&bob, slot_id).await;

    let path = format!("/api/appointments/{}/reassign", appointment_id);

    let collision = ctx
        .server
        .patch(&path)
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "student_id": bob.user_id }))
        .expect_failure()
        .await;
    collision.assert_status(StatusCode::CONFLICT);

    let mine = ctx
        .server
        .get("/api/appointments")
        .add_header(AUTHORIZATION, bearer(&alice))
        .await
        .json::<Value>();
    assert_eq!(mine[0]["id"], json!(appointment_id));

    let moved = ctx
        .server
        .patch(&path)
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "student_id": carol.user_id }))
        .await;
    moved.assert_status_ok();
    assert_eq!(moved.json::<Value>()["student_id"], json!(carol.user_id));
}

#[tokio::test]
async fn test_delete_appointment() {
    let ctx = TestContext::new();
    let owner = ctx.caller(Role::Staff).await;
    let other = ctx.caller(Role::Staff).await;
    let student = ctx.caller(Role::Student).await;
    let slot_id = ctx.slot(&owner, 1).await;
    let appointment_id = ctx.book(&student, slot_id).await;

    let path = format!("/api/appointments/{}", appointment_id);

    let forbidden = ctx
        .server
        .delete(&path)
        .add_header(AUTHORIZATION, bearer(&other))
        .expect_failure()
        .await;
    forbidden.assert_status(StatusCode::FORBIDDEN);

    let deleted = ctx
        .server
        .delete(&path)
        .add_header(AUTHORIZATION, bearer(&owner))
        .await;
    deleted.assert_status_ok();
    assert_eq!(
        deleted.json::<Value>(),
        json!({ "id": appointment_id, "deleted": true })
    );

    let gone = ctx
        .server
        .delete(&path)
        .add_header(AUTHORIZATION, bearer(&owner))
        .expect_failure()
        .await;
    gone.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_appointments_is_scoped_by_role() {
    let ctx = TestContext::new();
    let admin = ctx.caller(Role::Admin).await;
    let owner = ctx.caller(Role::Staff).await;
    let other_staff = ctx.caller(Role::Staff).await;
    let alice = ctx.caller(Role::Student).await;
    let bob = ctx.caller(Role::Student).await;

    let mine = ctx.slot(&owner, 5).await;
    let theirs = ctx.slot(&other_staff, 5).await;
    ctx.book(&alice, mine).await;
    ctx.book(&bob, mine).await;
    ctx.book(&bob, theirs).await;

    let count = |body: Value| body.as_array().map(Vec::len).unwrap_or_default();

    let for_alice = ctx
        .server
        .get("/api/appointments")
        .add_header(AUTHORIZATION, bearer(&alice))
        .await
        .json::<Value>();
    assert_eq!(count(for_alice), 1);

    let snooping = ctx
        .server
        .get(&format!("/api/appointments?student_id={}", bob.user_id))
        .add_header(AUTHORIZATION, bearer(&alice))
        .expect_failure()
        .await;
    snooping.assert_status(StatusCode::FORBIDDEN);

    let for_owner = ctx
        .server
        .get("/api/appointments")
        .add_header(AUTHORIZATION, bearer(&owner))
        .await
        .json::<Value>();
    assert_eq!(count(for_owner), 2);

    let bobs = ctx
        .server
        .get(&format!("/api/appointments?student_id={}", bob.user_id))
        .add_header(AUTHORIZATION, bearer(&admin))
        .await
        .json::<Value>();
    assert_eq!(count(bobs), 2);
}
