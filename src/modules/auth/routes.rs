use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::controller;
use crate::AppState;

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(controller::register))
        .route("/login", post(controller::login))
        .route("/verify-2fa", post(controller::verify_2fa))
        .route("/logout", post(controller::logout))
        .route("/me", get(controller::me))
        .route("/2fa/setup", post(controller::setup_2fa))
        .route("/2fa/activate", post(controller::activate_2fa))
        .route("/2fa/disable", post(controller::disable_2fa))
        .route("/forgot-password", post(controller::forgot_password))
        .route("/reset-password", post(controller::reset_password))
        .route(
            "/reset-password/{token}",
            get(controller::reset_password_probe),
        )
}
