use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::Result,
    query::{Filter, PageSpec},
    readings::{Flag, Reading, TIMESTAMP_COLUMN},
};

/// Persistence for one reading type.
///
/// Implementations own the canonical copy of every record; callers hold no
/// state between calls. Concurrent writes to the same record are last-write-wins.
#[async_trait]
pub trait ReadingStore<R: Reading>: Send + Sync {
    /// One page of the records matching `filter`, ordered by `page.sort`
    /// with `id` as tie-breaker.
    async fn find_page(&self, filter: &Filter<R>, page: &PageSpec) -> Result<Vec<R>>;

    /// Every record matching `filter`, newest first.
    async fn find_all(&self, filter: &Filter<R>) -> Result<Vec<R>>;

    async fn count(&self, filter: &Filter<R>) -> Result<u64>;

    /// Aggregate statistics over the records matching `filter`.
    async fn summarize(&self, filter: &Filter<R>) -> Result<R::Stats>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<R>>;

    async fn insert(&self, record: &R) -> Result<R>;

    /// Overwrite the stored record with the same id. `None` if it no longer exists.
    async fn update(&self, record: &R) -> Result<Option<R>>;

    /// `false` if no record had this id.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// Postgres
// ---------------------------------------------------------------------------

/// Stores readings of type `R` in the `R::TABLE` Postgres table.
///
/// Column names spliced into SQL come only from `Reading` constants and
/// `SortSpec`, never from request input.
pub struct PgReadingStore<R> {
    pool: PgPool,
    _reading: PhantomData<fn() -> R>,
}

impl<R> PgReadingStore<R> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _reading: PhantomData,
        }
    }
}

impl<R> Clone for PgReadingStore<R> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

fn push_filter<R: Reading>(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter<R>) {
    let mut keyword = " WHERE ";
    if let Some(range) = filter.range {
        qb.push(keyword)
            .push(TIMESTAMP_COLUMN)
            .push(" >= ")
            .push_bind(range.start)
            .push(" AND ")
            .push(TIMESTAMP_COLUMN)
            .push(" <= ")
            .push_bind(range.end);
        keyword = " AND ";
    }
    if let Some(flag) = filter.flag {
        qb.push(keyword).push(flag.column()).push(" = 1");
    }
}

fn select<R: Reading>() -> QueryBuilder<'static, Postgres> {
    QueryBuilder::new(format!("SELECT * FROM {}", R::TABLE))
}

fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

#[async_trait]
impl<R: Reading> ReadingStore<R> for PgReadingStore<R> {
    async fn find_page(&self, filter: &Filter<R>, page: &PageSpec) -> Result<Vec<R>> {
        let direction = if page.sort.descending { "DESC" } else { "ASC" };
        let mut qb = select::<R>();
        push_filter(&mut qb, filter);
        qb.push(format!(
            " ORDER BY {col} {dir}, id {dir} LIMIT ",
            col = page.sort.column,
            dir = direction
        ))
        .push_bind(to_i64(page.page_size))
        .push(" OFFSET ")
        .push_bind(to_i64(page.skip()));

        Ok(qb.build_query_as::<R>().fetch_all(&self.pool).await?)
    }

    async fn find_all(&self, filter: &Filter<R>) -> Result<Vec<R>> {
        let mut qb = select::<R>();
        push_filter(&mut qb, filter);
        qb.push(format!(" ORDER BY {TIMESTAMP_COLUMN} DESC, id DESC"));

        Ok(qb.build_query_as::<R>().fetch_all(&self.pool).await?)
    }

    async fn count(&self, filter: &Filter<R>) -> Result<u64> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", R::TABLE));
        push_filter(&mut qb, filter);

        let n = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(n.max(0) as u64)
    }

    async fn summarize(&self, filter: &Filter<R>) -> Result<R::Stats> {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", R::TOTALS_SQL, R::TABLE));
        push_filter(&mut qb, filter);

        let totals = qb.build_query_as::<R::Totals>().fetch_one(&self.pool).await?;
        Ok(totals.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<R>> {
        let mut qb = select::<R>();
        qb.push(" WHERE id = ").push_bind(id);

        Ok(qb.build_query_as::<R>().fetch_optional(&self.pool).await?)
    }

    async fn insert(&self, record: &R) -> Result<R> {
        let mut qb = QueryBuilder::new(format!(
            "INSERT INTO {} (id, {TIMESTAMP_COLUMN}, {}) VALUES (",
            R::TABLE,
            R::COLUMNS.join(", ")
        ));
        {
            let mut values = qb.separated(", ");
            values.push_bind(record.id());
            values.push_bind(record.recorded_at());
            for value in record.values() {
                values.push_bind(value);
            }
        }
        qb.push(") RETURNING *");

        Ok(qb.build_query_as::<R>().fetch_one(&self.pool).await?)
    }

    async fn update(&self, record: &R) -> Result<Option<R>> {
        let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", R::TABLE));
        {
            let mut assignments = qb.separated(", ");
            assignments
                .push(format!("{TIMESTAMP_COLUMN} = "))
                .push_bind_unseparated(record.recorded_at());
            for (column, value) in R::COLUMNS.iter().zip(record.values()) {
                assignments
                    .push(format!("{column} = "))
                    .push_bind_unseparated(value);
            }
        }
        qb.push(" WHERE id = ").push_bind(record.id()).push(" RETURNING *");

        Ok(qb.build_query_as::<R>().fetch_optional(&self.pool).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", R::TABLE))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
