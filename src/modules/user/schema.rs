use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::modules::auth::schema::UserResponse;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
    pub password_confirm: String,
    #[serde(default)]
    pub is_staff: bool,
}

/// Full-row profile update, last-writer-wins. Password and 2FA state are
/// managed through the auth endpoints, not here.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
}
