use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use crate::db::{Pagination, RepoError};
use crate::users::repo_types::{WorkerProfile, WorkerView};

/// Read side of worker profiles plus the worker's own category tags.
#[async_trait]
pub trait WorkerRepository: Send + Sync {
    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<WorkerView>, RepoError>;

    /// Active profiles only, ordered by user id. Returns the page and the total count.
    async fn list(&self, page: Pagination) -> Result<(Vec<WorkerView>, i64), RepoError>;

    /// Adds categories by case-insensitive name. Unknown names abort the whole call.
    async fn add_categories(&self, worker_id: i64, names: &[String]) -> Result<(), RepoError>;

    async fn remove_categories(&self, worker_id: i64, names: &[String]) -> Result<(), RepoError>;
}

#[derive(Debug, FromRow)]
struct WorkerRow {
    user_id: i64,
    exp_years: Option<i32>,
    description: Option<String>,
    phone: Option<String>,
    is_busy: bool,
    location: Option<String>,
    schedule: Option<String>,
    have_worker_profile: bool,
    name: String,
    categories: Vec<String>,
}

impl From<WorkerRow> for WorkerView {
    fn from(r: WorkerRow) -> Self {
        Self {
            profile: WorkerProfile {
                user_id: r.user_id,
                exp_years: r.exp_years,
                description: r.description,
                phone: r.phone,
                is_busy: r.is_busy,
                location: r.location,
                schedule: r.schedule,
                have_worker_profile: r.have_worker_profile,
            },
            name: r.name,
            categories: r.categories,
        }
    }
}

const SELECT_WORKER: &str = r#"
    SELECT w.user_id, w.exp_years, w.description, w.phone, w.is_busy,
           w.location, w.schedule, w.have_worker_profile, u.name,
           COALESCE(
               ARRAY_AGG(c.name::TEXT ORDER BY c.name) FILTER (WHERE c.id IS NOT NULL),
               '{}'::TEXT[]
           ) AS categories
    FROM worker_profiles w
    JOIN users u ON u.id = w.user_id
    LEFT JOIN worker_categories wc ON wc.worker_id = w.user_id
    LEFT JOIN categories c ON c.id = wc.category_id
"#;

#[derive(Clone)]
pub struct PgWorkerRepository {
    pool: PgPool,
}

impl PgWorkerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkerRepository for PgWorkerRepository {
    async fn find_by_user_id(&self, user_id: i64) -> Result<Option<WorkerView>, RepoError> {
        let row = sqlx::query_as::<_, WorkerRow>(&format!(
            "{SELECT_WORKER} WHERE w.user_id = $1 GROUP BY w.user_id, u.id"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(WorkerView::from))
    }

    async fn list(&self, page: Pagination) -> Result<(Vec<WorkerView>, i64), RepoError> {
        let rows = sqlx::query_as::<_, WorkerRow>(&format!(
            r#"{SELECT_WORKER}
            WHERE w.have_worker_profile
            GROUP BY w.user_id, u.id
            ORDER BY w.user_id
            LIMIT $1 OFFSET $2"#
        ))
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM worker_profiles WHERE have_worker_profile")
                .fetch_one(&self.pool)
                .await?;

        Ok((rows.into_iter().map(WorkerView::from).collect(), total))
    }

    async fn add_categories(&self, worker_id: i64, names: &[String]) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;
        for name in names {
            let category_id = category_id_by_name(&mut tx, name).await?;
            sqlx::query(
                r#"
                INSERT INTO worker_categories (worker_id, category_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(worker_id)
            .bind(category_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn remove_categories(&self, worker_id: i64, names: &[String]) -> Result<(), RepoError> {
        let mut tx = self.pool.begin().await?;
        for name in names {
            let category_id = category_id_by_name(&mut tx, name).await?;
            sqlx::query("DELETE FROM worker_categories WHERE worker_id = $1 AND category_id = $2")
                .bind(worker_id)
                .bind(category_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

async fn category_id_by_name(
    tx: &mut Transaction<'static, Postgres>,
    name: &str,
) -> Result<i64, RepoError> {
    sqlx::query_scalar::<_, i64>("SELECT id FROM categories WHERE LOWER(name) = LOWER($1)")
        .bind(name.trim())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| RepoError::InvalidReference(format!("category '{name}' not found")))
}
