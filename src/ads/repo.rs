use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::db::{Pagination, RepoError};

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Ad {
    pub id: i64,
    pub title: String,
    pub price: f64,
    pub category_id: i64,
    pub category: String,
    pub price_unit_id: i64,
    pub price_unit: String,
    pub user_id: i64,
    pub location: String,
    pub schedule: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Validated input for a new ad.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAd {
    pub title: String,
    pub price: f64,
    pub category_id: i64,
    pub price_unit_id: i64,
    pub location: String,
    pub schedule: String,
}

/// One column of a sparse ad update.
#[derive(Debug, Clone, PartialEq)]
pub enum AdField {
    Title(String),
    Price(f64),
    CategoryId(i64),
    PriceUnitId(i64),
    Location(String),
    Schedule(String),
}

#[derive(Debug, Default, Clone)]
pub struct AdFilter {
    pub category: Option<String>,
    pub location: Option<String>,
}

/// Ad storage. Mutations are owner-scoped: an ad of another user behaves as absent.
#[async_trait]
pub trait AdRepository: Send + Sync {
    /// Newest first. Returns the page and the total matching count.
    async fn list(&self, filter: &AdFilter, page: Pagination) -> Result<(Vec<Ad>, i64), RepoError>;

    async fn find(&self, id: i64) -> Result<Option<Ad>, RepoError>;

    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Ad>, RepoError>;

    async fn create(&self, user_id: i64, ad: &NewAd) -> Result<i64, RepoError>;

    /// Returns false when `user_id` owns no ad with this id.
    async fn update(&self, id: i64, user_id: i64, fields: &[AdField]) -> Result<bool, RepoError>;

    async fn delete(&self, id: i64, user_id: i64) -> Result<bool, RepoError>;
}

const SELECT_AD: &str = r#"
    SELECT a.id, a.title, a.price, a.category_id, c.name AS category,
           a.price_unit_id, p.name AS price_unit, a.user_id,
           a.location, a.schedule, a.created_at
    FROM ads a
    JOIN categories c ON c.id = a.category_id
    JOIN price_units p ON p.id = a.price_unit_id
"#;

/// Escapes LIKE metacharacters and wraps the needle for a substring match.
pub fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &AdFilter) {
    qb.push(" WHERE TRUE");
    if let Some(category) = &filter.category {
        qb.push(" AND c.name ILIKE ").push_bind(like_pattern(category));
    }
    if let Some(location) = &filter.location {
        qb.push(" AND a.location ILIKE ").push_bind(like_pattern(location));
    }
}

#[derive(Clone)]
pub struct PgAdRepository {
    pool: PgPool,
}

impl PgAdRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdRepository for PgAdRepository {
    async fn list(&self, filter: &AdFilter, page: Pagination) -> Result<(Vec<Ad>, i64), RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_AD);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset);
        let ads = qb.build_query_as::<Ad>().fetch_all(&self.pool).await?;

        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM ads a JOIN categories c ON c.id = a.category_id",
        );
        push_filter(&mut qb, filter);
        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;

        Ok((ads, total))
    }

    async fn find(&self, id: i64) -> Result<Option<Ad>, RepoError> {
        let ad = sqlx::query_as::<_, Ad>(&format!("{SELECT_AD} WHERE a.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ad)
    }

    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Ad>, RepoError> {
        let ads = sqlx::query_as::<_, Ad>(&format!(
            "{SELECT_AD} WHERE a.user_id = $1 ORDER BY a.created_at DESC, a.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ads)
    }

    async fn create(&self, user_id: i64, ad: &NewAd) -> Result<i64, RepoError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO ads (title, price, category_id, price_unit_id, user_id, location, schedule)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&ad.title)
        .bind(ad.price)
        .bind(ad.category_id)
        .bind(ad.price_unit_id)
        .bind(user_id)
        .bind(&ad.location)
        .bind(&ad.schedule)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update(&self, id: i64, user_id: i64, fields: &[AdField]) -> Result<bool, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE ads SET ");
        let mut set = qb.separated(", ");
        for field in fields {
            match field {
                AdField::Title(v) => set.push("title = ").push_bind_unseparated(v.clone()),
                AdField::Price(v) => set.push("price = ").push_bind_unseparated(*v),
                AdField::CategoryId(v) => set.push("category_id = ").push_bind_unseparated(*v),
                AdField::PriceUnitId(v) => set.push("price_unit_id = ").push_bind_unseparated(*v),
                AdField::Location(v) => set.push("location = ").push_bind_unseparated(v.clone()),
                AdField::Schedule(v) => set.push("schedule = ").push_bind_unseparated(v.clone()),
            };
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND user_id = ")
            .push_bind(user_id);

        let done = qb.build().execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete(&self, id: i64, user_id: i64) -> Result<bool, RepoError> {
        let done = sqlx::query("DELETE FROM ads WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
