use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::ProfileUpdate;
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
    users::Profile,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).patch(update_profile))
}

#[instrument(skip_all)]
pub async fn get_profile(AuthUser(user): AuthUser) -> Json<Profile> {
    Json(user.profile.0)
}

#[instrument(skip_all)]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> AppResult<Json<Profile>> {
    let Json(update) = payload.map_err(|e| {
        warn!(error = %e, "rejected profile body");
        AppError::validation("Invalid request body")
    })?;

    let patch = update.into_patch()?;
    let updated = state
        .users
        .update_profile(user.id, &patch)
        .await?
        // Deleted between token check and update.
        .ok_or(AppError::TokenInvalid)?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(updated.profile.0))
}
