use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use super::repo::Reference;
use crate::{error::AppError, state::AppState};

pub fn info_routes() -> Router<AppState> {
    Router::new()
        .route("/info/categories", get(categories))
        .route("/info/price_units", get(price_units))
}

#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Reference>>, AppError> {
    Ok(Json(state.reference.categories().await?))
}

#[instrument(skip(state))]
pub async fn price_units(State(state): State<AppState>) -> Result<Json<Vec<Reference>>, AppError> {
    Ok(Json(state.reference.price_units().await?))
}
