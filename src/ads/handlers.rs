use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::dto::{AdListQuery, AdListResponse, CreateAdRequest, PatchAdRequest};
use super::repo::{Ad, AdField, NewAd};
use crate::{auth::extractors::Principal, error::AppError, state::AppState};

pub fn ad_routes() -> Router<AppState> {
    Router::new()
        .route("/ads", get(list_ads))
        .route("/ads/:id", get(get_ad))
        .route("/my-ads", get(my_ads).post(create_ad))
        .route("/my-ads/:id", patch(update_ad).delete(delete_ad))
}

fn owned_ad_missing() -> AppError {
    AppError::not_found("ad not found or access denied")
}

async fn check_references(
    state: &AppState,
    category_id: Option<i64>,
    price_unit_id: Option<i64>,
) -> Result<(), AppError> {
    if let Some(id) = category_id {
        if !state.reference.category_exists(id).await? {
            return Err(AppError::not_found("category not found"));
        }
    }
    if let Some(id) = price_unit_id {
        if !state.reference.price_unit_exists(id).await? {
            return Err(AppError::not_found("price unit not found"));
        }
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_ads(
    State(state): State<AppState>,
    query: Result<Query<AdListQuery>, QueryRejection>,
) -> Result<Json<AdListResponse>, AppError> {
    let Query(query) = query?;
    let (filter, page) = query.split();
    let (ads, total) = state.ads.list(&filter, page).await?;
    Ok(Json(AdListResponse {
        ads,
        total,
        limit: page.limit,
        offset: page.offset,
    }))
}

#[instrument(skip(state))]
pub async fn get_ad(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Ad>, AppError> {
    let Path(id) = id?;
    let ad = state
        .ads
        .find(id)
        .await?
        .ok_or_else(|| AppError::not_found("ad not found"))?;
    Ok(Json(ad))
}

#[instrument(skip(state))]
pub async fn my_ads(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<Json<Vec<Ad>>, AppError> {
    Ok(Json(state.ads.list_by_owner(principal.user_id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_ad(
    State(state): State<AppState>,
    principal: Principal,
    payload: Result<Json<CreateAdRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Ad>), AppError> {
    let Json(payload) = payload?;
    let new_ad = NewAd::try_from(payload)?;
    check_references(&state, Some(new_ad.category_id), Some(new_ad.price_unit_id)).await?;

    let id = state.ads.create(principal.user_id, &new_ad).await?;
    let ad = state
        .ads
        .find(id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("ad {id} vanished after insert")))?;

    info!(ad_id = id, user_id = principal.user_id, "ad created");
    Ok((StatusCode::CREATED, Json(ad)))
}

#[instrument(skip(state, payload))]
pub async fn update_ad(
    State(state): State<AppState>,
    principal: Principal,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<PatchAdRequest>, JsonRejection>,
) -> Result<Json<Ad>, AppError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let fields = payload.into_fields()?;

    let category_id = fields.iter().find_map(|f| match f {
        AdField::CategoryId(v) => Some(*v),
        _ => None,
    });
    let price_unit_id = fields.iter().find_map(|f| match f {
        AdField::PriceUnitId(v) => Some(*v),
        _ => None,
    });
    check_references(&state, category_id, price_unit_id).await?;

    if !state.ads.update(id, principal.user_id, &fields).await? {
        warn!(ad_id = id, user_id = principal.user_id, "update of foreign or missing ad");
        return Err(owned_ad_missing());
    }
    let ad = state.ads.find(id).await?.ok_or_else(owned_ad_missing)?;

    info!(ad_id = id, user_id = principal.user_id, "ad updated");
    Ok(Json(ad))
}

#[instrument(skip(state))]
pub async fn delete_ad(
    State(state): State<AppState>,
    principal: Principal,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = id?;
    if !state.ads.delete(id, principal.user_id).await? {
        warn!(ad_id = id, user_id = principal.user_id, "delete of foreign or missing ad");
        return Err(owned_ad_missing());
    }
    info!(ad_id = id, user_id = principal.user_id, "ad deleted");
    Ok(Json(json!({ "message": "ad deleted" })))
}
