use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::token::TokenService;
use crate::error::AppError;

const BEARER_PREFIX: &str = "Bearer ";

/// Authenticated caller, taken by every protected handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub email: String,
}

impl Principal {
    /// Checks a raw `Authorization` header value against the token service.
    pub fn from_header(header: Option<&str>, tokens: &TokenService) -> Result<Self, AppError> {
        let header = header
            .ok_or_else(|| AppError::Unauthorized("Authorization header required".into()))?;

        let token = header.strip_prefix(BEARER_PREFIX).ok_or_else(|| {
            warn!("authorization header without bearer prefix");
            AppError::Unauthorized("Invalid header format".into())
        })?;

        let claims = tokens.validate(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::Unauthorized("Invalid token".into())
        })?;

        Ok(Principal {
            user_id: claims.user_id,
            email: claims.email,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
    Arc<TokenService>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let tokens = Arc::<TokenService>::from_ref(state);
        let header = match parts.headers.get(AUTHORIZATION) {
            None => None,
            Some(v) => Some(
                v.to_str()
                    .map_err(|_| AppError::Unauthorized("Invalid header format".into()))?,
            ),
        };
        Principal::from_header(header, &tokens)
    }
}
