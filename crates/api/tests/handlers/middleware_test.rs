use std::sync::Arc;

use axum::{
    http::{HeaderValue, StatusCode, header::AUTHORIZATION},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::Value;
use slotbook_api::middleware::{auth::Claims, error_handling::AppError};
use slotbook_core::{errors::BookingError, models::user::Role};
use slotbook_db::mock::store::MockStore;
use uuid::Uuid;

use crate::test_utils::{SECRET, TestContext, server_with, token_with};

#[rstest]
#[case(BookingError::NotFound("slot".into()), StatusCode::NOT_FOUND)]
#[case(BookingError::Validation("title".into()), StatusCode::BAD_REQUEST)]
#[case(BookingError::Authentication("token".into()), StatusCode::UNAUTHORIZED)]
#[case(BookingError::Authorization("role".into()), StatusCode::FORBIDDEN)]
#[case(BookingError::Conflict("slot full".into()), StatusCode::CONFLICT)]
#[case(BookingError::Database(eyre::eyre!("down")), StatusCode::INTERNAL_SERVER_ERROR)]
#[case(
    BookingError::Internal(Box::new(std::io::Error::other("boom"))),
    StatusCode::INTERNAL_SERVER_ERROR
)]
fn test_error_status_mapping(#[case] error: BookingError, #[case] expected: StatusCode) {
    assert_eq!(AppError(error).into_response().status(), expected);
}

#[tokio::test]
async fn test_health_and_version() {
    let ctx = TestContext::new();

    let health = ctx.server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.json::<Value>()["status"], "ok");

    let version = ctx.server.get("/version").await.json::<Value>();
    assert_eq!(version["name"], "slotbook-api");
    assert!(version["version"].is_string());
}

#[rstest]
#[case::wrong_secret("other-secret", 1)]
#[case::expired(SECRET, -1)]
#[tokio::test]
async fn test_rejected_tokens(#[case] secret: &str, #[case] hours: i64) {
    let ctx = TestContext::new();
    let token = token_with(
        &Claims {
            sub: Uuid::new_v4(),
            role: Role::Admin,
            exp: (Utc::now() + Duration::hours(hours)).timestamp(),
        },
        secret,
    );

    let response = ctx
        .server
        .get("/api/users")
        .add_header(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
        )
        .expect_failure()
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json::<Value>()["error"],
        "Authentication error: Invalid or expired token"
    );
}

#[tokio::test]
async fn test_missing_and_malformed_headers() {
    let ctx = TestContext::new();

    let missing = ctx.server.get("/api/appointments").expect_failure().await;
    missing.assert_status(StatusCode::UNAUTHORIZED);

    let basic = ctx
        .server
        .get("/api/appointments")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"))
        .expect_failure()
        .await;
    basic.assert_status(StatusCode::UNAUTHORIZED);

    let garbage = ctx
        .server
        .get("/api/appointments")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer not-a-jwt"))
        .expect_failure()
        .await;
    garbage.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let mut store = MockStore::new();
    store
        .expect_list_slots()
        .returning(|| Err(BookingError::Database(eyre::eyre!("connection refused"))));
    let server = server_with(Arc::new(store));

    let response = server.get("/api/slots").expect_failure().await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json::<Value>()["error"],
        "Database error: connection refused"
    );
}
