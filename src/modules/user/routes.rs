use axum::{routing::get, Router};
use std::sync::Arc;

use super::controller;
use crate::AppState;

pub fn user_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(controller::list_users).post(controller::create_user),
        )
        .route(
            "/{id}",
            get(controller::get_user)
                .put(controller::update_user)
                .delete(controller::delete_user),
        )
}
