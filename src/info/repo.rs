use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::db::RepoError;

/// Row of a name-only reference table.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Reference {
    pub id: i64,
    pub name: String,
}

/// Read-only access to the seeded categories and price units.
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    async fn categories(&self) -> Result<Vec<Reference>, RepoError>;

    async fn price_units(&self) -> Result<Vec<Reference>, RepoError>;

    async fn category_exists(&self, id: i64) -> Result<bool, RepoError>;

    async fn price_unit_exists(&self, id: i64) -> Result<bool, RepoError>;
}

#[derive(Clone)]
pub struct PgReferenceRepository {
    pool: PgPool,
}

impl PgReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferenceRepository for PgReferenceRepository {
    async fn categories(&self) -> Result<Vec<Reference>, RepoError> {
        let rows = sqlx::query_as::<_, Reference>("SELECT id, name FROM categories ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn price_units(&self) -> Result<Vec<Reference>, RepoError> {
        let rows = sqlx::query_as::<_, Reference>("SELECT id, name FROM price_units ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn category_exists(&self, id: i64) -> Result<bool, RepoError> {
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(found)
    }

    async fn price_unit_exists(&self, id: i64) -> Result<bool, RepoError> {
        let found: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM price_units WHERE id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(found)
    }
}
