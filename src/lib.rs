pub mod config;
pub mod modules;
pub mod services;

use axum::{middleware, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use modules::auth::auth_routes;
use modules::auth::interface::CredentialStore;
use modules::user::user_routes;
use services::mail::Mailer;
use services::reset::ResetService;
use services::security::security_headers;
use services::session::SessionService;
use services::totp::TotpService;

pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub sessions: SessionService,
    pub totp: TotpService,
    pub reset: ResetService,
}

pub async fn create_app(
    store: Arc<dyn CredentialStore>,
    mailer: Arc<dyn Mailer>,
    sessions: SessionService,
    public_base_url: String,
    totp_issuer: String,
) -> Router {
    let state = Arc::new(AppState {
        reset: ResetService::new(store.clone(), mailer, public_base_url),
        totp: TotpService::new(totp_issuer),
        sessions,
        store,
    });

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/auth", auth_routes())
        .nest("/users/", user_routes())
        .layer(middleware::from_fn(security_headers))
        .layer(RequestBodyLimitLayer::new(1024 * 100)) // 100KB max body
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn root() -> &'static str {
    "Account Service API"
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
