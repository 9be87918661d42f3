use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::dto::{CategoryNamesRequest, PageInfo, WorkerListResponse, WorkerResponse};
use crate::{
    auth::extractors::Principal, db::Pagination, error::AppError, state::AppState,
    users::repo_types::WorkerView,
};

pub fn worker_routes() -> Router<AppState> {
    Router::new()
        .route("/handyman", get(list_workers))
        .route(
            "/handyman/categories",
            get(my_categories)
                .post(add_categories)
                .delete(remove_categories),
        )
        .route("/handyman/:id", get(get_worker))
}

#[instrument(skip(state))]
pub async fn list_workers(
    State(state): State<AppState>,
    query: Result<Query<Pagination>, QueryRejection>,
) -> Result<Json<WorkerListResponse>, AppError> {
    let Query(page) = query?;
    let page = page.normalized();
    let (workers, total) = state.workers.list(page).await?;

    Ok(Json(WorkerListResponse {
        workers: workers.into_iter().map(WorkerResponse::from).collect(),
        pagination: PageInfo::new(page, total),
    }))
}

#[instrument(skip(state))]
pub async fn get_worker(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<WorkerResponse>, AppError> {
    let Path(id) = id?;
    let worker = state
        .workers
        .find_by_user_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("worker not found"))?;
    Ok(Json(worker.into()))
}

/// Category edits are reserved for callers that own a worker profile.
async fn own_profile(state: &AppState, principal: &Principal) -> Result<WorkerView, AppError> {
    match state.workers.find_by_user_id(principal.user_id).await? {
        Some(view) => Ok(view),
        None => {
            warn!(user_id = principal.user_id, "category access without worker profile");
            Err(AppError::Forbidden("worker not found".into()))
        }
    }
}

#[instrument(skip(state))]
pub async fn my_categories(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<String>>, AppError> {
    let view = own_profile(&state, &principal).await?;
    Ok(Json(view.categories))
}

#[instrument(skip(state, payload))]
pub async fn add_categories(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<CategoryNamesRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(payload) = payload?;
    own_profile(&state, &principal).await?;
    let names = payload.into_names()?;

    state.workers.add_categories(principal.user_id, &names).await?;
    info!(user_id = principal.user_id, count = names.len(), "categories added");
    Ok((StatusCode::CREATED, Json(json!({ "message": "categories added" }))))
}

#[instrument(skip(state, payload))]
pub async fn remove_categories(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<CategoryNamesRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(payload) = payload?;
    own_profile(&state, &principal).await?;
    let names = payload.into_names()?;

    state
        .workers
        .remove_categories(principal.user_id, &names)
        .await?;
    info!(user_id = principal.user_id, count = names.len(), "categories removed");
    Ok(Json(json!({ "message": "categories removed" })))
}
