use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::auth::interface::AuthError;
use crate::modules::auth::model::User;
use crate::AppState;

/// Scope claim carried by the short-lived token handed out when a login
/// still needs its second factor. Access tokens carry no scope, so the two
/// token kinds cannot be swapped for one another.
const PENDING_2FA_SCOPE: &str = "2fa_pending";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PendingClaims {
    pub sub: String, // user id
    pub scope: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,
}

pub struct SessionService {
    secret: String,
    access_token_duration: Duration,
    pending_token_duration: Duration,
}

impl SessionService {
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            access_token_duration: Duration::minutes(15),
            // A login attempt that never submits its code just lapses.
            pending_token_duration: Duration::minutes(5),
        }
    }

    pub fn create_access_token(
        &self,
        user_id: &str,
        email: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let exp = now + self.access_token_duration;

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    pub fn create_pending_token(
        &self,
        user_id: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let exp = now + self.pending_token_duration;

        let claims = PendingClaims {
            sub: user_id.to_string(),
            scope: PENDING_2FA_SCOPE.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    pub fn verify_access_token(
        &self,
        token: &str,
    ) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
    }

    pub fn verify_pending_token(
        &self,
        token: &str,
    ) -> Result<TokenData<PendingClaims>, jsonwebtoken::errors::Error> {
        let data = decode::<PendingClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )?;

        if data.claims.scope != PENDING_2FA_SCOPE {
            return Err(jsonwebtoken::errors::ErrorKind::InvalidToken.into());
        }
        Ok(data)
    }

    pub fn access_token_duration_secs(&self) -> i64 {
        self.access_token_duration.num_seconds()
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Extractor for endpoints that require a valid session. Decodes the
/// bearer token without touching the store.
pub struct AuthUser {
    pub id: String,
    pub email: String,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::Unauthorized)?;
        let data = state
            .sessions
            .verify_access_token(token)
            .map_err(|_| AuthError::Unauthorized)?;

        Ok(AuthUser {
            id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

/// Guard for the admin endpoints: valid session plus an active staff
/// account, checked against the store on every request.
pub struct StaffUser(pub User);

impl FromRequestParts<Arc<AppState>> for StaffUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let user = state
            .store
            .find_by_id(&auth.id)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if !user.is_active || !user.is_staff {
            return Err(AuthError::Forbidden);
        }
        Ok(StaffUser(user))
    }
}
