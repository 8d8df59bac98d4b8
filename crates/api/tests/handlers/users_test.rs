use axum::http::{StatusCode, header::AUTHORIZATION};
use fake::{Fake, faker::internet::en::SafeEmail, faker::name::en::Name};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use slotbook_core::models::user::Role;
use uuid::Uuid;

use crate::test_utils::{TestContext, bearer, id_of};

#[tokio::test]
async fn test_admin_creates_user() {
    let ctx = TestContext::new();
    let admin = ctx.caller(Role::Admin).await;
    let name: String = Name().fake();
    let email: String = SafeEmail().fake();

    let created = ctx
        .server
        .post("/api/users")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "name": name, "email": email }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let body = created.json::<Value>();
    assert_eq!(body["role"], "student");
    assert_eq!(body["email"], email.to_lowercase());

    let duplicate = ctx
        .server
        .post("/api/users")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "name": "Someone Else", "email": email, "role": "staff" }))
        .expect_failure()
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);
    assert_eq!(duplicate.json::<Value>()["error"], "Conflict: email already in use");
}

#[tokio::test]
async fn test_user_management_is_admin_only() {
    let ctx = TestContext::new();
    let staff = ctx.caller(Role::Staff).await;

    let response = ctx
        .server
        .get("/api/users")
        .add_header(AUTHORIZATION, bearer(&staff))
        .expect_failure()
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let response = ctx
        .server
        .post("/api/users")
        .add_header(AUTHORIZATION, bearer(&staff))
        .json(&json!({ "name": "x", "email": "x@example.com" }))
        .expect_failure()
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_users_by_role() {
    let ctx = TestContext::new();
    let admin = ctx.caller(Role::Admin).await;
    let staff = ctx.caller(Role::Staff).await;
    ctx.caller(Role::Student).await;

    let all = ctx
        .server
        .get("/api/users")
        .add_header(AUTHORIZATION, bearer(&admin))
        .await
        .json::<Value>();
    assert_eq!(all.as_array().map(Vec::len), Some(3));

    let filtered = ctx
        .server
        .get("/api/users?role=staff")
        .add_header(AUTHORIZATION, bearer(&admin))
        .await
        .json::<Value>();
    let staff_list = ctx
        .server
        .get("/api/users/staff")
        .add_header(AUTHORIZATION, bearer(&admin))
        .await
        .json::<Value>();
    assert_eq!(filtered, staff_list);
    assert_eq!(filtered[0]["id"], json!(staff.user_id));

    let invalid = ctx
        .server
        .get("/api/users?role=janitor")
        .add_header(AUTHORIZATION, bearer(&admin))
        .expect_failure()
        .await;
    invalid.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_user() {
    let ctx = TestContext::new();
    let admin = ctx.caller(Role::Admin).await;
    let student = ctx.caller(Role::Student).await;

    let response = ctx
        .server
        .put(&format!("/api/users/{}", student.user_id))
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "name": "Renamed", "role": "staff" }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["name"], "Renamed");
    assert_eq!(body["role"], "staff");

    let missing = ctx
        .server
        .put(&format!("/api/users/{}", Uuid::new_v4()))
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "name": "Ghost" }))
        .expect_failure()
        .await;
    missing.assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn test_delete_staff_user_cascades() {
    let ctx = TestContext::new();
    let admin = ctx.caller(Role::Admin).await;
    let staff = ctx.caller(Role::Staff).await;
    let first = ctx.slot(&staff, 2).await;
    let second = ctx.slot(&staff, 2).await;
    for slot_id in [first, first, second] {
        let student = ctx.caller(Role::Student).await;
        ctx.book(&student, slot_id).await;
    }

    let response = ctx
        .server
        .delete(&format!("/api/users/{}", staff.user_id))
        .add_header(AUTHORIZATION, bearer(&admin))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>(),
        json!({ "id": staff.user_id, "appointments_removed": 3, "slots_removed": 2 })
    );

    let slots = ctx.server.get("/api/slots").await.json::<Value>();
    assert_eq!(slots, json!([]));

    let appointments = ctx
        .server
        .get("/api/appointments")
        .add_header(AUTHORIZATION, bearer(&admin))
        .await
        .json::<Value>();
    assert_eq!(appointments, json!([]));
}

#[tokio::test]
async fn test_admin_cannot_delete_self() {
    let ctx = TestContext::new();
    let admin = ctx.caller(Role::Admin).await;

    let response = ctx
        .server
        .delete(&format!("/api/users/{}", admin.user_id))
        .add_header(AUTHORIZATION, bearer(&admin))
        .expect_failure()
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_created_staff_can_publish_slots() {
    let ctx = TestContext::new();
    let admin = ctx.caller(Role::Admin).await;

    let created = ctx
        .server
        .post("/api/users")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({ "name": "Grace Hopper", "email": "grace@example.com", "role": "staff" }))
        .await
        .json::<Value>();
    let staff_id = id_of(&created);

    let slot = ctx
        .server
        .post("/api/slots")
        .add_header(AUTHORIZATION, bearer(&admin))
        .json(&json!({
            "title": "Lab", "date": "Tuesday", "start_time": "9:00", "end_time": "9:30",
            "owner_id": staff_id
        }))
        .await;
    slot.assert_status(StatusCode::CREATED);
    assert_eq!(slot.json::<Value>()["owner"]["name"], "Grace Hopper");
}
