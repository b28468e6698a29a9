use axum::http::StatusCode;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use account_service::modules::auth::interface::CredentialStore;
use account_service::modules::auth::model::User;
use account_service::services::hashing;

use crate::common::{test_email, test_password, TestContext};

async fn create_staff(ctx: &TestContext, email: &str, password: &str) {
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: "admin".to_string(),
        email: email.to_string(),
        first_name: "Ad".to_string(),
        last_name: "Min".to_string(),
        phone: None,
        password_hash: hashing::hash_password(password).unwrap(),
        is_active: true,
        is_staff: true,
        two_factor_enabled: false,
        two_factor_secret: None,
        created_at: now,
        updated_at: now,
    };
    ctx.store.create(&user).await.unwrap();
}

async fn staff_token(ctx: &TestContext) -> String {
    let email = test_email();
    create_staff(ctx, &email, test_password()).await;

    let response = ctx
        .server
        .post("/auth/login")
        .json(&json!({ "email": &email, "password": test_password() }))
        .await;
    let body: serde_json::Value = response.json();
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn user_list_requires_authentication() {
    let ctx = TestContext::new().await;

    let response = ctx.server.get("/users/").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_list_requires_staff() {
    let ctx = TestContext::new().await;
    let token = ctx.register_and_login(&test_email(), test_password()).await;

    let response = ctx.server.get("/users/").authorization_bearer(&token).await;
    response.assert_status(StatusCode::FORBIDDEN);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn staff_can_list_users() {
    let ctx = TestContext::new().await;
    let member_email = test_email();
    ctx.register(&member_email, test_password()).await;
    let token = staff_token(&ctx).await;

    let response = ctx.server.get("/users/").authorization_bearer(&token).await;
    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().any(|u| u["email"] == member_email));
}

#[tokio::test]
async fn staff_can_create_users() {
    let ctx = TestContext::new().await;
    let token = staff_token(&ctx).await;
    let email = test_email();

    let response = ctx
        .server
        .post("/users/")
        .authorization_bearer(&token)
        .json(&json!({
            "username": "bob",
            "email": &email,
            "first_name": "Bob",
            "last_name": "Example",
            "password": test_password(),
            "password_confirm": test_password()
        }))
        .await;

    response.assert_status(StatusCode::CREATED);

    // The new account can log in right away.
    let login = ctx
        .server
        .post("/auth/login")
        .json(&json!({ "email": &email, "password": test_password() }))
        .await;
    login.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn staff_can_update_users() {
    let ctx = TestContext::new().await;
    let member_email = test_email();
    ctx.register(&member_email, test_password()).await;
    let token = staff_token(&ctx).await;

    let member = ctx
        .store
        .find_by_email(&member_email)
        .await
        .unwrap()
        .unwrap();

    let response = ctx
        .server
        .put(&format!("/users/{}", member.id))
        .authorization_bearer(&token)
        .json(&json!({
            "username": "renamed",
            "email": &member_email,
            "first_name": "New",
            "last_name": "Name",
            "phone": "555-0100",
            "is_active": false,
            "is_staff": false
        }))
        .await;

    response.assert_status(StatusCode::OK);

    let body: serde_json::Value = response.json();
    assert_eq!(body["username"], "renamed");
    assert_eq!(body["phone"], "555-0100");
    assert_eq!(body["is_active"], false);

    // Deactivated accounts cannot log in.
    let login = ctx
        .server
        .post("/auth/login")
        .json(&json!({ "email": &member_email, "password": test_password() }))
        .await;
    login.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn staff_can_delete_users() {
    let ctx = TestContext::new().await;
    let member_email = test_email();
    ctx.register(&member_email, test_password()).await;
    let token = staff_token(&ctx).await;

    let member = ctx
        .store
        .find_by_email(&member_email)
        .await
        .unwrap()
        .unwrap();

    let response = ctx
        .server
        .delete(&format!("/users/{}", member.id))
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::OK);

    let get = ctx
        .server
        .get(&format!("/users/{}", member.id))
        .authorization_bearer(&token)
        .await;
    get.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_user_returns_not_found() {
    let ctx = TestContext::new().await;
    let token = staff_token(&ctx).await;

    let response = ctx
        .server
        .get("/users/no-such-id")
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}
