use axum::http::StatusCode;

use crate::common::{test_email, test_password, TestContext};

#[tokio::test]
async fn me_returns_current_user() {
    let ctx = TestContext::new().await;
    let email = test_email();
    let token = ctx.register_and_login(&email, test_password()).await;

    let response = ctx.server.get("/auth/me").authorization_bearer(&token).await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert_eq!(body["email"], email);
}

#[tokio::test]
async fn me_without_token_returns_unauthorized() {
    let ctx = TestContext::new().await;

    let response = ctx.server.get("/auth/me").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_with_garbage_token_returns_unauthorized() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .get("/auth/me")
        .authorization_bearer("not-a-token")
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_acknowledges() {
    let ctx = TestContext::new().await;

    let response = ctx.server.post("/auth/logout").await;

    response.assert_status(StatusCode::OK);
}
