//! HTTP surface: router, shared state, response envelope and extractors.

use std::{sync::Arc, time::Instant};

use axum::{
    extract::{FromRequest, FromRequestParts, MatchedPath},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use time::Duration;

use demobank_core::{StorageBackend, StorageError};

use crate::{
    auth::{auth_middleware, require_admin},
    config::{AuthConfig, Config},
    error::ApiError,
    otp::OtpStore,
    session::SessionStore,
};

pub mod accounts;
pub mod admin;
pub mod login;
pub mod system;
pub mod transactions;
pub mod transfers;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageBackend>,
    pub otp: Arc<OtpStore>,
    pub sessions: Arc<SessionStore>,
    pub auth: Arc<AuthConfig>,
    pub expose_otp: bool,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        config: &Config,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            storage,
            otp: Arc::new(OtpStore::new(
                Duration::minutes(config.otp.ttl_minutes),
                config.otp.max_attempts,
            )),
            sessions: Arc::new(SessionStore::new(Duration::minutes(config.session.ttl_minutes))),
            auth: Arc::new(config.auth.clone()),
            expose_otp: config.otp.expose_code,
            metrics,
        }
    }

    /// Runs a storage call on the blocking pool; the engines do synchronous file I/O.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn StorageBackend) -> Result<T, StorageError> + Send + 'static,
    {
        let storage = self.storage.clone();
        tokio::task::spawn_blocking(move || f(storage.as_ref()))
            .await
            .map_err(|e| ApiError::Internal(format!("storage task failed: {}", e)))?
            .map_err(ApiError::from)
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { success: true, data })
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok(data))
}

/// `Json` whose rejection renders as an error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

pub fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

pub fn require_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ApiError::BadRequest(format!("invalid email address: {}", email))),
    }
}

async fn track_requests<B>(req: Request<B>, next: Next<B>) -> Response {
    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    tracing::debug!(%method, %path, %status, "Handled request");
    metrics::increment_counter!(
        "http_requests_total",
        "method" => method,
        "path" => path,
        "status" => status
    );
    metrics::histogram!("http_request_duration_seconds", start.elapsed().as_secs_f64());
    response
}

pub fn router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/accounts", get(admin::list_accounts).post(admin::create_account))
        .route(
            "/accounts/:id",
            get(admin::get_account).put(admin::update_account).delete(admin::delete_account),
        )
        .route("/users", get(admin::list_users).post(admin::create_user))
        .route(
            "/users/:id",
            get(admin::get_user).put(admin::update_user).delete(admin::delete_user),
        )
        .route("/backup", get(admin::list_backups).post(admin::create_backup))
        .route(
            "/backup/:id",
            get(admin::get_backup).put(admin::restore_backup).delete(admin::delete_backup),
        )
        .route_layer(middleware::from_fn(require_admin));

    let protected = Router::new()
        .route(
            "/api/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/api/transactions/:id",
            get(transactions::get_transaction)
                .put(transactions::update_transaction)
                .delete(transactions::delete_transaction),
        )
        .route("/api/accounts", get(accounts::list_accounts))
        .route("/api/accounts/:id", get(accounts::get_account))
        .route("/api/accounts/:id/transactions", get(accounts::account_transactions))
        .route("/api/transfers", post(transfers::create_transfer))
        .route("/api/auth/me", get(login::me))
        .route("/api/auth/logout", post(login::logout))
        .nest("/api/admin", admin)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let open = Router::new()
        .route("/api/auth/login", post(login::login))
        .route("/api/auth/signup", post(login::signup))
        .route("/api/auth/otp/verify", post(login::verify_otp))
        .route("/api/auth/otp/resend", post(login::resend_otp))
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics));

    Router::new()
        .merge(open)
        .merge(protected)
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}
