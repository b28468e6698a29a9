use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use rand::RngCore;

use crate::modules::auth::interface::{AuthError, CredentialStore};
use crate::modules::auth::model::{PasswordResetToken, User, RESET_TOKEN_TTL_HOURS};
use crate::services::hashing;
use crate::services::mail::Mailer;

/// Issues, validates and consumes password reset tokens. Requesting a
/// reset never reveals whether the email is registered; consuming a token
/// is at-most-once via the store's atomic check-and-set.
pub struct ResetService {
    store: Arc<dyn CredentialStore>,
    mailer: Arc<dyn Mailer>,
    public_base_url: String,
}

impl ResetService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        mailer: Arc<dyn Mailer>,
        public_base_url: String,
    ) -> Self {
        Self {
            store,
            mailer,
            public_base_url,
        }
    }

    /// 256 bits of randomness, URL-safe base64 (43 chars, no padding), so
    /// the token can sit in a path segment as-is.
    fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Issues a token and mails the reset link. Returns Ok for unknown
    /// emails too; earlier tokens for the same account stay valid.
    #[tracing::instrument(name = "ResetService::request", skip(self))]
    pub async fn request(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = self.store.find_by_email(email).await? else {
            tracing::debug!("password reset requested for unknown email");
            return Ok(());
        };

        let token = Self::generate_token();
        let reset = PasswordResetToken::new(&user.id, token.clone());
        self.store.create_reset_token(&reset).await?;

        let reset_url = format!(
            "{}/auth/reset-password/{}",
            self.public_base_url.trim_end_matches('/'),
            token
        );
        let body = format!("Click the link to reset your password: {reset_url}");

        if let Err(e) = self.mailer.send(&user.email, "Password Reset", &body).await {
            // A delivery error surfaced to the requester would reveal that
            // the account exists. Operators get it from the log instead.
            tracing::error!(error = %e, user_id = %user.id, "failed to send password reset email");
        }

        Ok(())
    }

    /// Read-only validity check, used before showing the new-password form.
    pub async fn validate(&self, token: &str) -> Result<User, AuthError> {
        let reset = self
            .store
            .find_reset_token(token)
            .await?
            .ok_or(AuthError::TokenInvalid)?;

        if reset.used {
            tracing::info!(user_id = %reset.user_id, "reset token already used");
            return Err(AuthError::TokenInvalid);
        }
        if !reset.is_valid(Utc::now()) {
            tracing::info!(user_id = %reset.user_id, "reset token expired");
            return Err(AuthError::TokenExpired);
        }

        self.store
            .find_by_id(&reset.user_id)
            .await?
            .ok_or(AuthError::TokenInvalid)
    }

    /// Hashes the new password and hands off to the store's atomic
    /// consume. Exactly one of two concurrent calls with the same token
    /// can succeed.
    #[tracing::instrument(name = "ResetService::consume", skip(self, new_password))]
    pub async fn consume(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let hash = hashing::hash_password(new_password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let cutoff = Utc::now() - Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.store.consume_reset_token(token, cutoff, &hash).await
    }
}
