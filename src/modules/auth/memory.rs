use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::interface::{AuthError, CredentialStore, Result};
use super::model::{PasswordResetToken, User};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    reset_tokens: HashMap<String, PasswordResetToken>,
}

/// In-memory credential store used by the test suite and for running the
/// service locally without a database. A single lock covers both maps so
/// `consume_reset_token` stays atomic.
#[derive(Default, Clone)]
pub struct MemoryCredentialStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reset tokens ever issued, used or not.
    pub async fn reset_token_count(&self) -> usize {
        self.inner.read().await.reset_tokens.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(id).cloned())
    }

    async fn create(&self, user: &User) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AuthError::DuplicateEmail);
        }
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn save(&self, user: &User) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user.id) {
            return Err(AuthError::UserNotFound);
        }
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.users.remove(id).ok_or(AuthError::UserNotFound)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn create_reset_token(&self, token: &PasswordResetToken) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner
            .reset_tokens
            .insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>> {
        let inner = self.inner.read().await;
        Ok(inner.reset_tokens.get(token).cloned())
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        cutoff: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<()> {
        // Write lock held across validate-and-mark keeps this check-and-set
        // atomic.
        let mut inner = self.inner.write().await;

        let reset = inner
            .reset_tokens
            .get(token)
            .cloned()
            .ok_or(AuthError::TokenInvalid)?;
        if reset.used {
            tracing::info!(user_id = %reset.user_id, "reset token already used");
            return Err(AuthError::TokenInvalid);
        }
        if reset.created_at < cutoff {
            tracing::info!(user_id = %reset.user_id, "reset token expired");
            return Err(AuthError::TokenExpired);
        }

        let user = inner
            .users
            .get_mut(&reset.user_id)
            .ok_or(AuthError::TokenInvalid)?;
        user.password_hash = new_password_hash.to_string();
        user.updated_at = Utc::now();

        if let Some(stored) = inner.reset_tokens.get_mut(token) {
            stored.used = true;
        }
        Ok(())
    }
}
