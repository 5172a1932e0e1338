use axum::{
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

use demobank_core::Role;

use crate::api::AppState;
use crate::error::ApiError;

/// Authenticated caller identity, available to handlers via request extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct CallerIdentity {
    pub name: String,
    pub role: Role,
    /// Set when the caller signed in through the OTP flow.
    pub user_id: Option<u64>,
    pub session_token: Option<String>,
}

impl CallerIdentity {
    pub fn anonymous() -> Self {
        Self {
            name: "anonymous".to_string(),
            role: Role::Admin,
            user_id: None,
            session_token: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Constant-time string comparison for secrets.
pub fn secrets_match(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

fn parse_role(role: &str) -> Role {
    if role.eq_ignore_ascii_case("admin") {
        Role::Admin
    } else {
        Role::User
    }
}

fn bearer_token<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Resolves the caller from a session token or an API key. A presented but
/// unknown credential is always rejected; a missing one is only rejected when
/// auth is enabled.
pub async fn auth_middleware<B>(
    State(state): State<AppState>,
    mut req: Request<B>,
    next: Next<B>,
) -> Response {
    let now = OffsetDateTime::now_utc();

    let identity = if let Some(key) = req.headers().get("X-API-Key").and_then(|v| v.to_str().ok()) {
        match state.auth.api_keys.iter().find(|entry| secrets_match(&entry.key, key)) {
            Some(entry) => {
                tracing::debug!(caller = %entry.name, role = %entry.role, "Authenticated API key");
                CallerIdentity {
                    name: entry.name.clone(),
                    role: parse_role(&entry.role),
                    user_id: None,
                    session_token: None,
                }
            }
            None => {
                tracing::warn!("Invalid API key presented");
                return ApiError::Unauthorized("Invalid API key".to_string()).into_response();
            }
        }
    } else if let Some(token) = bearer_token(&req) {
        match state.sessions.get(token, now) {
            Some(session) => CallerIdentity {
                name: format!("user:{}", session.user_id),
                role: session.role,
                user_id: Some(session.user_id),
                session_token: Some(session.token),
            },
            None => {
                return ApiError::Unauthorized("Session expired or invalid".to_string())
                    .into_response();
            }
        }
    } else if !state.auth.enabled {
        CallerIdentity::anonymous()
    } else {
        return ApiError::Unauthorized(
            "Missing credentials. Provide Authorization: Bearer <session token> or X-API-Key header"
                .to_string(),
        )
        .into_response();
    };

    req.extensions_mut().insert(identity);
    next.run(req).await
}

/// Rejects non-admin callers. Runs after `auth_middleware`.
pub async fn require_admin<B>(req: Request<B>, next: Next<B>) -> Response {
    match req.extensions().get::<CallerIdentity>() {
        Some(identity) if identity.is_admin() => next.run(req).await,
        Some(identity) => {
            tracing::warn!(caller = %identity.name, "Admin route refused");
            ApiError::Forbidden("Administrator role required".to_string()).into_response()
        }
        None => ApiError::Unauthorized("Not authenticated".to_string()).into_response(),
    }
}
