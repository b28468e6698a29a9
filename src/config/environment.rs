use std::env;

/// Environment configuration
/// Loads and validates environment variables
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub public_base_url: String,
    pub totp_issuer: String,
    pub mail_from: String,
    pub postmark_base_url: Option<String>,
    pub postmark_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;

        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_string())?;

        let public_base_url =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let totp_issuer =
            env::var("TOTP_ISSUER").unwrap_or_else(|_| "Account Service".to_string());

        let mail_from =
            env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@localhost".to_string());

        // Both must be set to use the HTTP mail backend; otherwise outgoing
        // mail is written to the log (development mode).
        let postmark_base_url = env::var("POSTMARK_BASE_URL").ok();
        let postmark_token = env::var("POSTMARK_TOKEN").ok();

        Ok(Self {
            database_url,
            jwt_secret,
            public_base_url,
            totp_issuer,
            mail_from,
            postmark_base_url,
            postmark_token,
        })
    }
}
