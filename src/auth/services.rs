use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use super::dto::{LoginRequest, LoginResponse, PublicUser, RegisterRequest, RegisterResponse};
use super::password::{hash_password, verify_password};
use super::token::TokenService;
use crate::error::AppError;
use crate::users::repo::UserRepository;
use crate::users::repo_types::{NewUser, RoleKind};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn token_failure(e: super::token::TokenError) -> AppError {
    AppError::Internal(format!("token generation failed: {e}"))
}

pub async fn register(
    users: &dyn UserRepository,
    tokens: &TokenService,
    payload: RegisterRequest,
) -> Result<RegisterResponse, AppError> {
    let email = normalize_email(&payload.email);
    let name = payload.name.trim().to_string();

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::bad_request("Invalid email"));
    }
    if name.is_empty() {
        return Err(AppError::bad_request("Name is required"));
    }
    if payload.password.is_empty() {
        return Err(AppError::bad_request("Password is required"));
    }
    let role = RoleKind::from_id(payload.role)
        .ok_or_else(|| AppError::bad_request(format!("Unknown role {}", payload.role)))?;

    if users.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::Conflict("User already exists".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = users
        .create(NewUser {
            name,
            email,
            password_hash,
            role,
        })
        .await?;

    let token = tokens.issue(user.id, &user.email).map_err(token_failure)?;

    info!(user_id = user.id, role = role.name(), "user registered");
    Ok(RegisterResponse {
        id: user.id,
        email: user.email,
        message: "User registered",
        token,
    })
}

pub async fn login(
    users: &dyn UserRepository,
    tokens: &TokenService,
    payload: LoginRequest,
) -> Result<LoginResponse, AppError> {
    let email = normalize_email(&payload.email);
    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(invalid());
    }

    let token = tokens.issue(user.id, &user.email).map_err(token_failure)?;

    info!(user_id = user.id, "user logged in");
    Ok(LoginResponse {
        token,
        user: PublicUser {
            id: user.id,
            email: user.email,
            role: user.role_name,
        },
    })
}
