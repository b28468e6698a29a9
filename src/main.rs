use std::sync::Arc;

use account_service::config::{environment::Config, init_db};
use account_service::modules::auth::crud::MySqlCredentialStore;
use account_service::services::mail::{LogMailer, Mailer, PostmarkMailer};
use account_service::services::session::SessionService;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load environment configuration");

    let db = init_db(&config.database_url).await;
    tracing::info!("Connected to MySQL");

    let store = Arc::new(MySqlCredentialStore::new(db));

    let mailer: Arc<dyn Mailer> = match (&config.postmark_base_url, &config.postmark_token) {
        (Some(base_url), Some(token)) => Arc::new(PostmarkMailer::new(
            reqwest::Client::new(),
            base_url.clone(),
            config.mail_from.clone(),
            token.clone(),
        )),
        _ => {
            tracing::warn!("no mail transport configured, outgoing mail goes to the log");
            Arc::new(LogMailer)
        }
    };

    let sessions = SessionService::new(config.jwt_secret.clone());

    let app = account_service::create_app(
        store,
        mailer,
        sessions,
        config.public_base_url.clone(),
        config.totp_issuer.clone(),
    )
    .await;

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    tracing::info!("Server running on http://localhost:3000");
    axum::serve(listener, app).await.unwrap();
}
