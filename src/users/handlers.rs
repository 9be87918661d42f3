use axum::{extract::rejection::JsonRejection, extract::State, routing::get, Json, Router};
use tracing::instrument;

use super::dto::{PatchProfileRequest, ProfileResponse, UpdatedProfileResponse};
use super::reconciler;
use super::repo_types::ProfileUpdate;
use crate::{auth::extractors::Principal, error::AppError, state::AppState};

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).patch(patch_profile))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<ProfileResponse>, AppError> {
    let view =
        reconciler::get_profile(state.users.as_ref(), state.workers.as_ref(), &principal).await?;
    Ok(Json(view.into()))
}

#[instrument(skip(state, payload))]
pub async fn patch_profile(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<PatchProfileRequest>, JsonRejection>,
) -> Result<Json<UpdatedProfileResponse>, AppError> {
    let Json(payload) = payload?;
    let update = ProfileUpdate::try_from(payload)?;
    let updated = reconciler::update_profile(
        state.users.as_ref(),
        state.workers.as_ref(),
        &principal,
        update,
    )
    .await?;
    Ok(Json(updated.into()))
}
