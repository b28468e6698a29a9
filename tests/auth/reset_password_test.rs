use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use account_service::modules::auth::interface::CredentialStore;
use account_service::modules::auth::model::PasswordResetToken;

use crate::common::{test_email, test_password, TestContext};

use super::forgot_password_test::extract_token;

async fn request_reset_token(ctx: &TestContext, email: &str) -> String {
    ctx.server
        .post("/auth/forgot-password")
        .json(&json!({ "email": email }))
        .await;

    let mail = ctx.mailer.last().expect("reset mail should be sent");
    extract_token(&mail.body)
}

async fn login_status(ctx: &TestContext, email: &str, password: &str) -> StatusCode {
    ctx.server
        .post("/auth/login")
        .json(&json!({ "email": email, "password": password }))
        .await
        .status_code()
}

#[tokio::test]
async fn reset_round_trip_changes_the_password() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email, test_password()).await;
    let token = request_reset_token(&ctx, &email).await;

    // The link target validates before any form is shown.
    let probe = ctx
        .server
        .get(&format!("/auth/reset-password/{token}"))
        .await;
    probe.assert_status(StatusCode::OK);

    let response = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "token": &token,
            "password": "NewPass1!",
            "password_confirm": "NewPass1!"
        }))
        .await;
    response.assert_status(StatusCode::OK);

    assert_eq!(
        login_status(&ctx, &email, test_password()).await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        login_status(&ctx, &email, "NewPass1!").await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn token_is_single_use() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email, test_password()).await;
    let token = request_reset_token(&ctx, &email).await;

    let first = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "token": &token,
            "password": "NewPass1!",
            "password_confirm": "NewPass1!"
        }))
        .await;
    first.assert_status(StatusCode::OK);

    let second = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "token": &token,
            "password": "OtherPass1!",
            "password_confirm": "OtherPass1!"
        }))
        .await;
    second.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = second.json();
    assert_eq!(body["error"], "invalid_or_expired_token");

    // The second attempt must not have changed anything.
    assert_eq!(
        login_status(&ctx, &email, "NewPass1!").await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn concurrent_consumption_succeeds_exactly_once() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email, test_password()).await;
    let token = request_reset_token(&ctx, &email).await;

    let first = ctx.server.post("/auth/reset-password").json(&json!({
        "token": &token,
        "password": "NewPass1!",
        "password_confirm": "NewPass1!"
    }));
    let second = ctx.server.post("/auth/reset-password").json(&json!({
        "token": &token,
        "password": "OtherPass1!",
        "password_confirm": "OtherPass1!"
    }));

    let (a, b) = tokio::join!(first, second);

    let statuses = [a.status_code(), b.status_code()];
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::OK).count(),
        1,
        "exactly one consume should win, got {statuses:?}"
    );
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::BAD_REQUEST)
            .count(),
        1
    );
}

#[tokio::test]
async fn expired_token_is_rejected_and_password_unchanged() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email, test_password()).await;

    let user = ctx.store.find_by_email(&email).await.unwrap().unwrap();

    // 25 hours old, one past the 24 hour limit.
    let mut stale = PasswordResetToken::new(&user.id, "stale-token".to_string());
    stale.created_at = Utc::now() - Duration::hours(25);
    ctx.store.create_reset_token(&stale).await.unwrap();

    let probe = ctx.server.get("/auth/reset-password/stale-token").await;
    probe.assert_status(StatusCode::BAD_REQUEST);

    let response = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "token": "stale-token",
            "password": "NewPass1!",
            "password_confirm": "NewPass1!"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "invalid_or_expired_token");

    assert_eq!(
        login_status(&ctx, &email, test_password()).await,
        StatusCode::OK
    );
}

#[tokio::test]
async fn unknown_token_is_rejected() {
    let ctx = TestContext::new().await;

    let probe = ctx.server.get("/auth/reset-password/no-such-token").await;
    probe.assert_status(StatusCode::BAD_REQUEST);

    let response = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "token": "no-such-token",
            "password": "NewPass1!",
            "password_confirm": "NewPass1!"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn mismatched_passwords_leave_the_token_valid() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email, test_password()).await;
    let token = request_reset_token(&ctx, &email).await;

    let response = ctx
        .server
        .post("/auth/reset-password")
        .json(&json!({
            "token": &token,
            "password": "NewPass1!",
            "password_confirm": "Different1!"
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Rejected before the token was touched.
    let probe = ctx
        .server
        .get(&format!("/auth/reset-password/{token}"))
        .await;
    probe.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn reset_token_is_url_safe() {
    let ctx = TestContext::new().await;
    let email = test_email();
    ctx.register(&email, test_password()).await;
    let token = request_reset_token(&ctx, &email).await;

    assert_eq!(token.len(), 43);
    assert!(token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}
