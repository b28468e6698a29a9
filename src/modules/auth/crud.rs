use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::DbPool;

use super::interface::{AuthError, CredentialStore, Result};
use super::model::{PasswordResetToken, User};

/// MySQL-backed credential store. Unique indexes on `users.email` and
/// `password_resets.token` enforce the model invariants at the database
/// level.
pub struct MySqlCredentialStore {
    pool: DbPool,
}

impl MySqlCredentialStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn is_duplicate_key(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl CredentialStore for MySqlCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, username, email, first_name, last_name, phone, password_hash,
                 is_active, is_staff, two_factor_enabled, two_factor_secret,
                 created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.two_factor_enabled)
        .bind(&user.two_factor_secret)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                AuthError::DuplicateEmail
            } else {
                AuthError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn save(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                username = ?, email = ?, first_name = ?, last_name = ?, phone = ?,
                password_hash = ?, is_active = ?, is_staff = ?,
                two_factor_enabled = ?, two_factor_secret = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.two_factor_enabled)
        .bind(&user.two_factor_secret)
        .bind(Utc::now())
        .bind(&user.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AuthError::UserNotFound);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn create_reset_token(&self, token: &PasswordResetToken) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO password_resets (token, user_id, created_at, used)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&token.token)
        .bind(&token.user_id)
        .bind(token.created_at)
        .bind(token.used)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> Result<Option<PasswordResetToken>> {
        let row =
            sqlx::query_as::<_, PasswordResetToken>("SELECT * FROM password_resets WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    async fn consume_reset_token(
        &self,
        token: &str,
        cutoff: DateTime<Utc>,
        new_password_hash: &str,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Row lock so a concurrent consume of the same token blocks here and
        // then sees `used = true`.
        let row = sqlx::query_as::<_, PasswordResetToken>(
            "SELECT * FROM password_resets WHERE token = ? FOR UPDATE",
        )
        .bind(token)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(reset) = row else {
            return Err(AuthError::TokenInvalid);
        };
        if reset.used {
            tracing::info!(user_id = %reset.user_id, "reset token already used");
            return Err(AuthError::TokenInvalid);
        }
        if reset.created_at < cutoff {
            tracing::info!(user_id = %reset.user_id, "reset token expired");
            return Err(AuthError::TokenExpired);
        }

        sqlx::query("UPDATE password_resets SET used = TRUE WHERE token = ?")
            .bind(token)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(new_password_hash)
            .bind(Utc::now())
            .bind(&reset.user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
