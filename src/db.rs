use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::DbConfig;

/// Storage failures, classified so handlers can map them onto HTTP statuses.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidReference(String),
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return RepoError::Conflict("resource already exists".into());
            }
            if db_err.is_foreign_key_violation() {
                return RepoError::InvalidReference("referenced entity does not exist".into());
            }
        }
        RepoError::Database(e)
    }
}

pub async fn connect(cfg: &DbConfig) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.max_connections)
        .min_connections(cfg.min_connections)
        .acquire_timeout(cfg.acquire_timeout)
        .idle_timeout(cfg.idle_timeout)
        .max_lifetime(cfg.max_lifetime)
        .connect(&cfg.url)
        .await
        .context("connect to database")?;
    info!(
        max_connections = cfg.max_connections,
        "postgres pool ready"
    );
    Ok(pool)
}

/// Limit/offset query parameters shared by the list endpoints.
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

pub const MAX_PAGE_SIZE: i64 = 100;

impl Pagination {
    /// Clamps to a usable window: non-positive limits fall back to the default.
    pub fn normalized(self) -> Self {
        let limit = if self.limit <= 0 {
            default_limit()
        } else {
            self.limit.min(MAX_PAGE_SIZE)
        };
        Self {
            limit,
            offset: self.offset.max(0),
        }
    }

    pub fn page(&self) -> i64 {
        self.offset / self.limit + 1
    }

    pub fn pages(&self, total: i64) -> i64 {
        (total + self.limit - 1) / self.limit
    }
}
