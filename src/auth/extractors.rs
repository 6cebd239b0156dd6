use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use crate::{error::AppError, state::AppState, users::User};

/// The authenticated user behind the request's bearer token.
pub struct AuthUser(pub User);

/// Extracts the credential from an `Authorization: Bearer <token>` value.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// No `Authorization` header at all is `MissingToken`; a present header that
/// is not visible ASCII or not a bearer credential is `TokenInvalid`.
fn token_from_headers(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers.get(AUTHORIZATION).ok_or(AppError::MissingToken)?;
    let header = value.to_str().map_err(|_| {
        warn!("non-ascii authorization header");
        AppError::TokenInvalid
    })?;
    bearer_token(header).ok_or_else(|| {
        warn!("invalid auth scheme");
        AppError::TokenInvalid
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)?;
        state
            .auth
            .verify_token(token)
            .await
            .map(AuthUser)
            .ok_or(AppError::TokenInvalid)
    }
}
