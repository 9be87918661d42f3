use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use super::dto::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use super::services;
use crate::{error::AppError, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let Json(payload) = payload?;
    let resp = services::register(state.users.as_ref(), &state.tokens, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(payload) = payload?;
    let resp = services::login(state.users.as_ref(), &state.tokens, payload).await?;
    Ok(Json(resp))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{app::build_app, fake::FakeStore, state::AppState};

    async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn register_then_login() {
        let app = build_app(AppState::fake());
        let creds = json!({"email": "a@x.com", "name": "A", "password": "p", "role": 2});

        let (status, body) = post_json(app.clone(), "/auth/register", creds).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["id"].as_i64().unwrap() > 0);
        assert!(!body["token"].as_str().unwrap().is_empty());

        let (status, body) = post_json(
            app,
            "/auth/login",
            json!({"email": "a@x.com", "password": "p"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "a@x.com");
        assert_eq!(body["user"]["role"], "worker");
    }

    #[tokio::test]
    async fn second_registration_conflicts() {
        let store = FakeStore::new();
        let app = build_app(AppState::fake_with(store.clone()));
        let creds = json!({"email": "a@x.com", "name": "A", "password": "p"});

        let (status, _) = post_json(app.clone(), "/auth/register", creds.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = post_json(app, "/auth/register", creds).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "User already exists");
        assert_eq!(store.user_count(), 1);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = build_app(AppState::fake());
        post_json(
            app.clone(),
            "/auth/register",
            json!({"email": "a@x.com", "name": "A", "password": "p"}),
        )
        .await;
        let (status, body) = post_json(
            app,
            "/auth/login",
            json!({"email": "a@x.com", "password": "nope"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
    }
}
