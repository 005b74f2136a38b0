use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::Reading;
use crate::{
    db::ReadingStore,
    error::{Error, Result},
    query::{self, Filter, PageSpec},
};

/// One page of records plus the size of the whole matching set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub records: Vec<R>,
    pub total: u64,
}

/// CRUD and query operations over one reading type.
///
/// Holds nothing but the injected store: every call is resolved against the
/// store's current state.
pub struct ReadingService<R: Reading> {
    store: Arc<dyn ReadingStore<R>>,
}

impl<R: Reading> Clone for ReadingService<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<R: Reading> ReadingService<R> {
    pub fn new(store: Arc<dyn ReadingStore<R>>) -> Self {
        Self { store }
    }

    /// At most `page.page_size` records, with the size of the full collection.
    pub async fn list(&self, page: &PageSpec) -> Result<Page<R>> {
        self.page(Filter::all(), page).await
    }

    /// Like [`list`](Self::list), restricted to records with `flag` set. The
    /// total counts the matching subset only.
    pub async fn list_where(&self, flag: R::Flag, page: &PageSpec) -> Result<Page<R>> {
        self.page(Filter::flag(flag), page).await
    }

    async fn page(&self, filter: Filter<R>, page: &PageSpec) -> Result<Page<R>> {
        debug!(table = R::TABLE, page = page.page, page_size = page.page_size, "Listing readings");
        let records = self.store.find_page(&filter, page).await?;
        let total = self.store.count(&filter).await?;
        Ok(Page { records, total })
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<R> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<R>())
    }

    /// The most recent record by timestamp, or `None` if the collection is empty.
    pub async fn get_latest(&self) -> Result<Option<R>> {
        let mut rows = self.store.find_page(&Filter::all(), &PageSpec::latest()).await?;
        Ok(rows.pop())
    }

    /// Every record in `[start, end]`, newest first. An inverted range is not
    /// an error; it matches nothing.
    pub async fn get_by_date_range(&self, start: Option<&str>, end: Option<&str>) -> Result<Vec<R>> {
        let range = query::build_date_range(start, end)?;
        debug!(table = R::TABLE, start = %range.start, end = %range.end, "Listing readings by date range");
        self.store.find_all(&Filter::range(Some(range))).await
    }

    /// Aggregate over the whole collection, or over `[start, end]` when both
    /// bounds are given.
    pub async fn statistics(&self, start: Option<&str>, end: Option<&str>) -> Result<R::Stats> {
        let range = query::optional_date_range(start, end)?;
        debug!(table = R::TABLE, ranged = range.is_some(), "Computing statistics");
        self.store.summarize(&Filter::range(range)).await
    }

    pub async fn create(&self, fields: R::Fields) -> Result<R> {
        let record = R::create(Uuid::new_v4(), Utc::now(), fields)?;
        let saved = self.store.insert(&record).await?;
        info!(table = R::TABLE, id = %saved.id(), "Reading created");
        Ok(saved)
    }

    /// Apply the provided fields to an existing record. Absent fields keep
    /// their stored value.
    pub async fn update(&self, id: Uuid, fields: R::Fields) -> Result<R> {
        let mut record = self.get_by_id(id).await?;
        record.apply(fields)?;
        let saved = self
            .store
            .update(&record)
            .await?
            .ok_or_else(|| not_found::<R>())?;
        info!(table = R::TABLE, id = %id, "Reading updated");
        Ok(saved)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(not_found::<R>());
        }
        info!(table = R::TABLE, id = %id, "Reading deleted");
        Ok(())
    }
}

pub(crate) fn not_found<R: Reading>() -> Error {
    Error::NotFound(format!("Registro de {} no encontrado", R::NOUN))
}
