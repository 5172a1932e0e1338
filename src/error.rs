use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use demobank_core::StorageError;

use crate::otp::OtpError;

/// Errors returned from handlers. Every variant renders as
/// `{ "success": false, "error": "..." }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Gone(String),
    #[error("{0}")]
    Locked(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::Locked(_) => StatusCode::LOCKED,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { success: false, error })).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::AccountNotFound(_)
            | StorageError::TransactionNotFound(_)
            | StorageError::UserNotFound(_)
            | StorageError::BackupNotFound(_) => ApiError::NotFound(err.to_string()),
            StorageError::DuplicateEmail(_)
            | StorageError::DuplicateId(_)
            | StorageError::IdsExhausted(_) => ApiError::Conflict(err.to_string()),
            StorageError::InsufficientFunds { .. } | StorageError::InvalidTransfer(_) => {
                ApiError::Unprocessable(err.to_string())
            }
            StorageError::Io(_) | StorageError::Serialization(_) | StorageError::Other(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::UnknownChallenge => ApiError::NotFound(err.to_string()),
            OtpError::Expired | OtpError::AlreadyUsed => ApiError::Gone(err.to_string()),
            OtpError::Locked => ApiError::Locked(err.to_string()),
            OtpError::Mismatch { .. } => ApiError::Unauthorized(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
