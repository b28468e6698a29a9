use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::modules::auth::{
    interface::AuthError,
    model::User,
    schema::{MessageResponse, UserResponse},
};
use crate::services::hashing;
use crate::services::session::StaffUser;
use crate::AppState;

use super::schema::{CreateUserRequest, UpdateUserRequest, UserListResponse};

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
) -> Result<Json<UserListResponse>, AuthError> {
    let users = state.store.list().await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    if req.password != req.password_confirm {
        return Err(AuthError::PasswordMismatch);
    }
    if req.password.len() < 8 {
        return Err(AuthError::WeakPassword(
            "must be at least 8 characters".to_string(),
        ));
    }

    if state.store.find_by_email(&req.email).await?.is_some() {
        return Err(AuthError::DuplicateEmail);
    }

    let password_hash =
        hashing::hash_password(&req.password).map_err(|e| AuthError::Internal(e.to_string()))?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: req.username,
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        phone: req.phone,
        password_hash,
        is_active: true,
        is_staff: req.is_staff,
        two_factor_enabled: false,
        two_factor_secret: None,
        created_at: now,
        updated_at: now,
    };

    state.store.create(&user).await?;

    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AuthError> {
    let user = state
        .store
        .find_by_id(&id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(Json(user.into()))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    let mut user = state
        .store
        .find_by_id(&id)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    user.username = req.username;
    user.email = req.email;
    user.first_name = req.first_name;
    user.last_name = req.last_name;
    user.phone = req.phone;
    user.is_active = req.is_active;
    user.is_staff = req.is_staff;
    user.updated_at = Utc::now();

    state.store.save(&user).await?;

    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AuthError> {
    state.store.delete(&id).await?;

    Ok(Json(MessageResponse {
        message: "User deleted",
    }))
}
