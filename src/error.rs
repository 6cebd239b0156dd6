use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::users::StoreError;

/// Errors surfaced by the API. Infrastructure sources are logged, never sent.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("Email is already registered")]
    DuplicateEmail,
    #[error("Username is already taken")]
    DuplicateUsername,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Missing Authorization header")]
    MissingToken,
    #[error("Invalid or expired token")]
    TokenInvalid,
    #[error("Service temporarily unavailable")]
    StoreUnavailable(#[source] anyhow::Error),
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::DuplicateEmail | Self::DuplicateUsername => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidCredentials | Self::MissingToken | Self::TokenInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => Self::DuplicateEmail,
            StoreError::DuplicateName => Self::DuplicateUsername,
            StoreError::Unavailable(e) => Self::StoreUnavailable(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::StoreUnavailable(src) => error!(error = ?src, "user store unavailable"),
            Self::Internal(src) => error!(error = ?src, "internal error"),
            _ => {}
        }
        let body = Json(json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}
