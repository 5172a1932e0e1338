//! Sign-in flow: password check, OTP challenge, session issue.

use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use demobank_core::{NewUser, Role, UserView};

use crate::{
    auth::{secrets_match, CallerIdentity},
    error::ApiError,
    otp::{mask_phone, OtpChallenge, OtpError},
};

use super::{
    created, ok, require_email, require_non_empty, ApiJson, ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub challenge_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub masked_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub challenge_id: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendRequest {
    pub challenge_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    pub user: UserView,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub logged_out: bool,
}

fn challenge_response(
    state: &AppState,
    challenge: &OtpChallenge,
    phone: &str,
) -> ChallengeResponse {
    if !state.expose_otp {
        // Stand-in for SMS delivery.
        tracing::info!(
            user_id = challenge.user_id,
            code = challenge.code(),
            "Verification code issued"
        );
    }
    ChallengeResponse {
        challenge_id: challenge.id.clone(),
        expires_at: challenge.expires_at,
        masked_phone: mask_phone(phone),
        code: state.expose_otp.then(|| challenge.code().to_string()),
    }
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<ChallengeResponse> {
    metrics::increment_counter!("login_attempts_total");
    let email = req.email.clone();
    let user = state.run(move |s| s.find_user_by_email(&email)).await?;

    let user = match user {
        Some(user) if secrets_match(&user.password, &req.password) => user,
        _ => {
            metrics::increment_counter!("login_failures_total");
            tracing::warn!(email = %req.email.trim(), "Failed login");
            return Err(ApiError::Unauthorized("Invalid email or password".to_string()));
        }
    };

    let challenge = state.otp.issue(user.id, OffsetDateTime::now_utc());
    Ok(ok(challenge_response(&state, &challenge, &user.phone)))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> ApiResult<SessionResponse> {
    let now = OffsetDateTime::now_utc();
    let user_id = match state.otp.verify(&req.challenge_id, &req.code, now) {
        Ok(user_id) => user_id,
        Err(e) => {
            if matches!(e, OtpError::Mismatch { .. } | OtpError::Locked) {
                metrics::increment_counter!("otp_failures_total");
            }
            tracing::warn!(error = %e, "OTP verification failed");
            return Err(e.into());
        }
    };

    let user = state.run(move |s| s.get_user(user_id)).await?;
    let session = state.sessions.create(&user, now);
    tracing::info!(user_id, "User signed in");
    Ok(ok(SessionResponse {
        token: session.token,
        expires_at: session.expires_at,
        user: user.view(),
    }))
}

pub async fn resend_otp(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResendRequest>,
) -> ApiResult<ChallengeResponse> {
    let challenge = state.otp.resend(&req.challenge_id, OffsetDateTime::now_utc())?;
    let user_id = challenge.user_id;
    let user = state.run(move |s| s.get_user(user_id)).await?;
    Ok(ok(challenge_response(&state, &challenge, &user.phone)))
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserView>>), ApiError> {
    require_email(&req.email)?;
    require_non_empty("password", &req.password)?;
    require_non_empty("name", &req.name)?;

    let new_user = NewUser {
        id: None,
        email: req.email,
        password: req.password,
        name: req.name,
        role: Role::User,
        phone: req.phone,
    };
    let user = state.run(move |s| s.create_user(new_user)).await?;
    tracing::info!(user_id = user.id, "User signed up");
    Ok(created(user.view()))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
) -> ApiResult<LogoutResponse> {
    match identity.session_token {
        Some(token) => Ok(ok(LogoutResponse {
            logged_out: state.sessions.revoke(&token),
        })),
        None => Err(ApiError::BadRequest("No active session".to_string())),
    }
}

pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
) -> ApiResult<UserView> {
    let user_id = identity
        .user_id
        .ok_or_else(|| ApiError::Unauthorized("Not signed in".to_string()))?;
    let user = state.run(move |s| s.get_user(user_id)).await?;
    Ok(ok(user.view()))
}
