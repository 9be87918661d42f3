use crate::state::AppState;
use axum::Router;

mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
mod services;
pub mod token;

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
