use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use super::repo_types::{NewUser, RoleKind, UserField, UserRecord, WorkerField};
use crate::db::RepoError;

/// Credential store and entry point for transactional profile edits.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError>;

    /// Inserts the user and, for the worker role, its worker profile in one transaction.
    async fn create(&self, new_user: NewUser) -> Result<UserRecord, RepoError>;

    async fn begin(&self) -> Result<Box<dyn ProfileTx>, RepoError>;
}

/// Open profile transaction. Dropping it without `commit` rolls everything back.
#[async_trait]
pub trait ProfileTx: Send {
    /// Returns the number of user rows touched.
    async fn update_user_fields(
        &mut self,
        user_id: i64,
        fields: &[UserField],
    ) -> Result<u64, RepoError>;

    async fn find_user(&mut self, user_id: i64) -> Result<Option<UserRecord>, RepoError>;

    /// Marks the profile active and applies `fields`. Returns 0 when the user has no
    /// worker profile row; nothing is created in that case.
    async fn update_worker_fields(
        &mut self,
        user_id: i64,
        fields: &[WorkerField],
    ) -> Result<u64, RepoError>;

    async fn commit(self: Box<Self>) -> Result<(), RepoError>;
}

const SELECT_USER: &str = r#"
    SELECT u.id, u.name, u.email, u.password_hash, u.role_id, r.role_name, u.created_at
    FROM users u
    JOIN roles r ON r.id = u.role_id
"#;

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!("{SELECT_USER} WHERE u.email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!("{SELECT_USER} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser) -> Result<UserRecord, RepoError> {
        let mut tx = self.pool.begin().await?;

        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            WITH inserted AS (
                INSERT INTO users (name, email, password_hash, role_id)
                VALUES ($1, $2, $3, $4)
                RETURNING id, name, email, password_hash, role_id, created_at
            )
            SELECT i.id, i.name, i.email, i.password_hash, i.role_id, r.role_name, i.created_at
            FROM inserted i
            JOIN roles r ON r.id = i.role_id
            "#,
        )
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role.id())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match RepoError::from(e) {
            RepoError::Conflict(_) => RepoError::Conflict("User already exists".into()),
            other => other,
        })?;

        if new_user.role == RoleKind::Worker {
            sqlx::query(
                r#"
                INSERT INTO worker_profiles (user_id, have_worker_profile)
                VALUES ($1, TRUE)
                "#,
            )
            .bind(user.id)
            .execute(&mut *tx)
            .await?;
            debug!(user_id = user.id, "worker profile created at registration");
        }

        tx.commit().await?;
        Ok(user)
    }

    async fn begin(&self) -> Result<Box<dyn ProfileTx>, RepoError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgProfileTx { tx }))
    }
}

pub struct PgProfileTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ProfileTx for PgProfileTx {
    async fn update_user_fields(
        &mut self,
        user_id: i64,
        fields: &[UserField],
    ) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET ");
        let mut set = qb.separated(", ");
        for field in fields {
            match field {
                UserField::Name(name) => {
                    set.push("name = ");
                    set.push_bind_unseparated(name.clone());
                }
            }
        }
        qb.push(" WHERE id = ").push_bind(user_id);

        let result = qb.build().execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    async fn find_user(&mut self, user_id: i64) -> Result<Option<UserRecord>, RepoError> {
        let user = sqlx::query_as::<_, UserRecord>(&format!("{SELECT_USER} WHERE u.id = $1"))
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn update_worker_fields(
        &mut self,
        user_id: i64,
        fields: &[WorkerField],
    ) -> Result<u64, RepoError> {
        let mut categories: Option<&[i64]> = None;
        let mut qb =
            QueryBuilder::<Postgres>::new("UPDATE worker_profiles SET have_worker_profile = TRUE");
        for field in fields {
            match field {
                WorkerField::Phone(v) => {
                    qb.push(", phone = ").push_bind(v.clone());
                }
                WorkerField::ExpYears(v) => {
                    qb.push(", exp_years = ").push_bind(*v);
                }
                WorkerField::Description(v) => {
                    qb.push(", description = ").push_bind(v.clone());
                }
                WorkerField::IsBusy(v) => {
                    qb.push(", is_busy = ").push_bind(*v);
                }
                WorkerField::Location(v) => {
                    qb.push(", location = ").push_bind(v.clone());
                }
                WorkerField::Schedule(v) => {
                    qb.push(", schedule = ").push_bind(v.clone());
                }
                WorkerField::Categories(ids) => categories = Some(ids.as_slice()),
            }
        }
        qb.push(" WHERE user_id = ").push_bind(user_id);

        let affected = qb.build().execute(&mut *self.tx).await?.rows_affected();
        if affected == 0 {
            return Ok(0);
        }

        if let Some(ids) = categories {
            replace_worker_categories(&mut self.tx, user_id, ids).await?;
        }
        Ok(affected)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.commit().await?;
        Ok(())
    }
}

async fn replace_worker_categories(
    tx: &mut Transaction<'static, Postgres>,
    worker_id: i64,
    ids: &[i64],
) -> Result<(), RepoError> {
    let known: Vec<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?;
    if let Some(missing) = ids.iter().find(|id| !known.contains(id)) {
        return Err(RepoError::InvalidReference(format!(
            "category {missing} not found"
        )));
    }

    sqlx::query("DELETE FROM worker_categories WHERE worker_id = $1")
        .bind(worker_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query(
        r#"
        INSERT INTO worker_categories (worker_id, category_id)
        SELECT $1, UNNEST($2::BIGINT[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(worker_id)
    .bind(ids)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
