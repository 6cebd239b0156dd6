use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RegisterRequest, UsernameAvailability},
        extractors::AuthUser,
        services::UsernameStatus,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/check-username/:username", get(check_username))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

fn bad_body(rejection: JsonRejection) -> AppError {
    tracing::warn!(error = %rejection, "rejected request body");
    AppError::validation("Invalid request body")
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let Json(payload) = payload.map_err(bad_body)?;
    let res = state
        .auth
        .register(&payload.email, &payload.password, payload.name.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(res)))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(payload) = payload.map_err(bad_body)?;
    let res = state.auth.login(&payload.email, &payload.password).await?;
    Ok(Json(res))
}

#[instrument(skip(state))]
pub async fn check_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Response {
    match state.auth.check_username_availability(&username).await {
        Ok(status) => {
            let code = match status {
                UsernameStatus::TooShort => StatusCode::BAD_REQUEST,
                UsernameStatus::Taken | UsernameStatus::Available => StatusCode::OK,
            };
            let body = UsernameAvailability {
                available: status.is_available(),
                message: status.message().into(),
            };
            (code, Json(body)).into_response()
        }
        Err(e) => {
            error!(error = ?e, "username availability check failed");
            let body = UsernameAvailability {
                available: false,
                message: "Error checking username availability".into(),
            };
            (e.status(), Json(body)).into_response()
        }
    }
}

#[instrument(skip_all)]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<PublicUser> {
    Json(PublicUser::from(&user))
}
