use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub two_factor_enabled: bool,
    pub two_factor_secret: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Single-use password reset capability. Rows are never deleted, only
/// marked used, so the table doubles as an audit trail.
#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub used: bool,
}

/// Reset tokens expire 24 hours after creation.
pub const RESET_TOKEN_TTL_HOURS: i64 = 24;

impl PasswordResetToken {
    pub fn new(user_id: &str, token: String) -> Self {
        Self {
            token,
            user_id: user_id.to_string(),
            created_at: Utc::now(),
            used: false,
        }
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.used && now - self.created_at < Duration::hours(RESET_TOKEN_TTL_HOURS)
    }
}
