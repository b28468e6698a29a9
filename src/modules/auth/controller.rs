use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::modules::auth::{
    interface::AuthError,
    model::User,
    schema::{
        ActivateTwoFactorRequest, ForgotPasswordRequest, LoginChallengeResponse, LoginRequest,
        LoginResponse, MessageResponse, RegisterRequest, RegisterResponse, ResetPasswordRequest,
        ResetTokenProbeResponse, TwoFactorSetupResponse, UserResponse, Verify2faRequest,
    },
};
use crate::services::hashing;
use crate::services::session::AuthUser;
use crate::AppState;

fn internal(e: impl std::fmt::Display) -> AuthError {
    AuthError::Internal(e.to_string())
}

fn issue_session(state: &AppState, user: &User) -> Result<LoginResponse, AuthError> {
    let access_token = state
        .sessions
        .create_access_token(&user.id, &user.email)
        .map_err(internal)?;

    Ok(LoginResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.sessions.access_token_duration_secs(),
    })
}

fn check_code_format(code: &str) -> Result<(), AuthError> {
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::InvalidTwoFactorCode);
    }
    Ok(())
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AuthError> {
    req.validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;

    if req.password != req.password_confirm {
        return Err(AuthError::PasswordMismatch);
    }
    if req.password.len() < 8 {
        return Err(AuthError::WeakPassword(
            "must be at least 8 characters".to_string(),
        ));
    }

    // Pre-check for a friendlier error; the unique index still catches the
    // race in `create`.
    if state.store.find_by_email(&req.email).await?.is_some() {
        return Err(AuthError::DuplicateEmail);
    }

    let password_hash = hashing::hash_password(&req.password).map_err(internal)?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: req.username,
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        phone: None,
        password_hash,
        is_active: true,
        is_staff: false,
        two_factor_enabled: false,
        two_factor_secret: None,
        created_at: now,
        updated_at: now,
    };

    state.store.create(&user).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user: user.into() }),
    ))
}

/// Password step of the login state machine. Unknown email, wrong
/// password and deactivated account all produce the identical
/// `invalid_credentials` response.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Response, AuthError> {
    let user = state
        .store
        .find_by_email(&req.email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !user.is_active {
        return Err(AuthError::InvalidCredentials);
    }

    let valid = hashing::verify_password(&req.password, &user.password_hash).map_err(internal)?;
    if !valid {
        return Err(AuthError::InvalidCredentials);
    }

    if user.two_factor_enabled {
        // Suspend the session: the pending token is the only thing the
        // client holds until the code checks out.
        let two_factor_token = state
            .sessions
            .create_pending_token(&user.id)
            .map_err(internal)?;

        return Ok(Json(LoginChallengeResponse {
            requires_2fa: true,
            two_factor_token,
        })
        .into_response());
    }

    Ok(Json(issue_session(&state, &user)?).into_response())
}

/// Second step: exchanges a pending token plus a valid TOTP code for a
/// session. A wrong code leaves the pending token usable for another try.
pub async fn verify_2fa(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Verify2faRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    check_code_format(&req.code)?;

    let data = state
        .sessions
        .verify_pending_token(&req.two_factor_token)
        .map_err(|_| AuthError::NoPendingChallenge)?;

    let user = state
        .store
        .find_by_id(&data.claims.sub)
        .await?
        .ok_or(AuthError::NoPendingChallenge)?;

    let secret = user
        .two_factor_secret
        .as_deref()
        .ok_or(AuthError::NoPendingChallenge)?;

    if !state.totp.verify(secret, &user.email, &req.code)? {
        return Err(AuthError::InvalidTwoFactorCode);
    }

    Ok(Json(issue_session(&state, &user)?))
}

/// Sessions are bearer tokens; logging out is the client discarding
/// them. The endpoint exists so the flow has an explicit end.
pub async fn logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Logged out",
    })
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, AuthError> {
    let user = state
        .store
        .find_by_id(&auth.id)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    Ok(Json(user.into()))
}

/// Provisions (or re-displays) the TOTP secret without enabling 2FA.
/// Idempotent: a second call returns the same secret.
pub async fn setup_2fa(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<TwoFactorSetupResponse>, AuthError> {
    let mut user = state
        .store
        .find_by_id(&auth.id)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    let secret = match user.two_factor_secret.clone() {
        Some(secret) => secret,
        None => {
            let secret = state.totp.generate_secret()?;
            user.two_factor_secret = Some(secret.clone());
            state.store.save(&user).await?;
            secret
        }
    };

    Ok(Json(TwoFactorSetupResponse {
        otpauth_url: state.totp.provisioning_uri(&secret, &user.email)?,
        qr_code: state.totp.qr_data_url(&secret, &user.email)?,
        secret,
    }))
}

/// Confirms the first code from the authenticator app and flips the flag.
pub async fn activate_2fa(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<ActivateTwoFactorRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    check_code_format(&req.code)?;

    let mut user = state
        .store
        .find_by_id(&auth.id)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    let secret = user
        .two_factor_secret
        .clone()
        .ok_or(AuthError::TwoFactorNotProvisioned)?;

    if !state.totp.verify(&secret, &user.email, &req.code)? {
        return Err(AuthError::InvalidTwoFactorCode);
    }

    user.two_factor_enabled = true;
    state.store.save(&user).await?;

    Ok(Json(MessageResponse {
        message: "Two-factor authentication enabled",
    }))
}

/// Clears the flag but keeps the secret, so re-enabling skips
/// re-provisioning.
pub async fn disable_2fa(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<MessageResponse>, AuthError> {
    let mut user = state
        .store
        .find_by_id(&auth.id)
        .await?
        .ok_or(AuthError::Unauthorized)?;

    user.two_factor_enabled = false;
    state.store.save(&user).await?;

    Ok(Json(MessageResponse {
        message: "Two-factor authentication disabled",
    }))
}

/// Always acknowledges, whether or not the email matches an account.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    state.reset.request(&req.email).await?;

    Ok(Json(MessageResponse {
        message: "If an account with that email exists, a password reset link has been sent",
    }))
}

/// Validity probe for the reset form page.
pub async fn reset_password_probe(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<ResetTokenProbeResponse>, AuthError> {
    state.reset.validate(&token).await?;
    Ok(Json(ResetTokenProbeResponse { valid: true }))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    if req.password != req.password_confirm {
        return Err(AuthError::PasswordMismatch);
    }
    if req.password.len() < 8 {
        return Err(AuthError::WeakPassword(
            "must be at least 8 characters".to_string(),
        ));
    }

    state.reset.consume(&req.token, &req.password).await?;

    Ok(Json(MessageResponse {
        message: "Password has been reset",
    }))
}
