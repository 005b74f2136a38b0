use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::ReadingStore;
use crate::{
    error::Result,
    query::{Filter, PageSpec, SortSpec},
    readings::Reading,
};

/// In-process store keyed by record id.
///
/// Wrapped in `Arc` so it can be cheaply cloned and shared across tasks.
/// Uses `tokio::sync::RwLock` so concurrent readers never block each other.
pub struct MemoryStore<R> {
    inner: Arc<RwLock<HashMap<Uuid, R>>>,
}

impl<R> MemoryStore<R> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<R> Default for MemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for MemoryStore<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Reading> MemoryStore<R> {
    /// Matching records, sorted per `sort` with `id` as tie-breaker.
    async fn sorted(&self, filter: &Filter<R>, sort: SortSpec) -> Vec<R> {
        let mut rows: Vec<R> = self
            .inner
            .read()
            .await
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            let ord = a
                .sort_key(sort.column)
                .cmp(&b.sort_key(sort.column))
                .then_with(|| a.id().cmp(&b.id()));
            if sort.descending {
                ord.reverse()
            } else {
                ord
            }
        });
        rows
    }
}

#[async_trait]
impl<R: Reading> ReadingStore<R> for MemoryStore<R> {
    async fn find_page(&self, filter: &Filter<R>, page: &PageSpec) -> Result<Vec<R>> {
        let skip = usize::try_from(page.skip()).unwrap_or(usize::MAX);
        let take = usize::try_from(page.page_size).unwrap_or(usize::MAX);
        Ok(self
            .sorted(filter, page.sort)
            .await
            .into_iter()
            .skip(skip)
            .take(take)
            .collect())
    }

    async fn find_all(&self, filter: &Filter<R>) -> Result<Vec<R>> {
        Ok(self.sorted(filter, SortSpec::default()).await)
    }

    async fn count(&self, filter: &Filter<R>) -> Result<u64> {
        let n = self
            .inner
            .read()
            .await
            .values()
            .filter(|r| filter.matches(r))
            .count();
        Ok(n as u64)
    }

    async fn summarize(&self, filter: &Filter<R>) -> Result<R::Stats> {
        let rows: Vec<R> = self
            .inner
            .read()
            .await
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        Ok(R::totals(&rows).into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<R>> {
        Ok(self.inner.read().await.get(&id).cloned())
    }

    async fn insert(&self, record: &R) -> Result<R> {
        self.inner
            .write()
            .await
            .insert(record.id(), record.clone());
        Ok(record.clone())
    }

    async fn update(&self, record: &R) -> Result<Option<R>> {
        let mut guard = self.inner.write().await;
        Ok(guard.get_mut(&record.id()).map(|slot| {
            *slot = record.clone();
            slot.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.inner.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::{
        query::DateRange,
        readings::{GasReading, MotionFlag, MotionReading},
        stats::MotionStats,
    };

    fn gas(minutes: i64, gas_level: i32) -> GasReading {
        GasReading {
            id: Uuid::new_v4(),
            recorded_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
            gas_level,
            fan_state: 0,
        }
    }

    fn motion(motion_detected: i32, alarm_triggered: i32) -> MotionReading {
        MotionReading {
            id: Uuid::new_v4(),
            recorded_at: Utc::now(),
            motion_detected,
            alarm_triggered,
        }
    }

    fn levels(rows: &[GasReading]) -> Vec<i32> {
        rows.iter().map(|r| r.gas_level).collect()
    }

    #[tokio::test]
    async fn empty_store_returns_nothing() {
        let store = MemoryStore::<GasReading>::new();
        assert!(store.find_all(&Filter::all()).await.unwrap().is_empty());
        assert_eq!(store.count(&Filter::all()).await.unwrap(), 0);
        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn default_order_is_newest_first() {
        let store = MemoryStore::<GasReading>::new();
        for (minutes, level) in [(5, 50), (0, 0), (10, 100)] {
            store.insert(&gas(minutes, level)).await.unwrap();
        }

        let rows = store.find_page(&Filter::all(), &PageSpec::default()).await.unwrap();
        assert_eq!(levels(&rows), [100, 50, 0]);
    }

    #[tokio::test]
    async fn pages_follow_skip_and_size() {
        let store = MemoryStore::<GasReading>::new();
        for i in 0..25 {
            store.insert(&gas(i, i as i32)).await.unwrap();
        }

        let page = |page| PageSpec {
            page,
            page_size: 10,
            sort: SortSpec {
                column: "gas_level",
                descending: false,
            },
        };
        assert_eq!(levels(&store.find_page(&Filter::all(), &page(1)).await.unwrap()), (0..10).collect::<Vec<_>>());
        assert_eq!(levels(&store.find_page(&Filter::all(), &page(3)).await.unwrap()), (20..25).collect::<Vec<_>>());
        assert!(store.find_page(&Filter::all(), &page(4)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn range_filter_is_inclusive_and_inverted_is_empty() {
        let store = MemoryStore::<GasReading>::new();
        let rows = [gas(0, 1), gas(10, 2), gas(20, 3)];
        for r in &rows {
            store.insert(r).await.unwrap();
        }

        let inclusive = Filter::range(Some(DateRange {
            start: rows[0].recorded_at,
            end: rows[1].recorded_at,
        }));
        assert_eq!(levels(&store.find_all(&inclusive).await.unwrap()), [2, 1]);

        let inverted = Filter::range(Some(DateRange {
            start: rows[2].recorded_at,
            end: rows[0].recorded_at,
        }));
        assert!(store.find_all(&inverted).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn flag_filter_restricts_count_and_rows() {
        let store = MemoryStore::<MotionReading>::new();
        for (m, a) in [(1, 0), (0, 0), (1, 1)] {
            store.insert(&motion(m, a)).await.unwrap();
        }

        let detected = Filter::flag(MotionFlag::MotionDetected);
        assert_eq!(store.count(&detected).await.unwrap(), 2);
        let rows = store.find_all(&Filter::flag(MotionFlag::AlarmTriggered)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].alarm_triggered, 1);
    }

    #[tokio::test]
    async fn summarize_respects_filter() {
        let store = MemoryStore::<MotionReading>::new();
        assert_eq!(
            store.summarize(&Filter::all()).await.unwrap(),
            MotionStats::default()
        );

        for (m, a) in [(1, 0), (0, 0), (1, 1)] {
            store.insert(&motion(m, a)).await.unwrap();
        }
        let stats = store.summarize(&Filter::all()).await.unwrap();
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.motion_detected, 2);
        assert_eq!(stats.alarm_pct, 33.33);

        let alarms = store
            .summarize(&Filter::flag(MotionFlag::AlarmTriggered))
            .await
            .unwrap();
        assert_eq!(alarms.total_records, 1);
        assert_eq!(alarms.alarm_pct, 100.0);
    }

    #[tokio::test]
    async fn update_overwrites_existing_only() {
        let store = MemoryStore::<GasReading>::new();
        let mut r = gas(0, 10);
        store.insert(&r).await.unwrap();

        r.gas_level = 20;
        assert_eq!(store.update(&r).await.unwrap().unwrap().gas_level, 20);
        assert_eq!(store.count(&Filter::all()).await.unwrap(), 1);

        let stranger = gas(0, 30);
        assert!(store.update(&stranger).await.unwrap().is_none());
        assert!(store.find_by_id(stranger.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_reports_whether_a_record_was_removed() {
        let store = MemoryStore::<GasReading>::new();
        let r = gas(0, 10);
        store.insert(&r).await.unwrap();

        assert!(store.delete(r.id).await.unwrap());
        assert!(!store.delete(r.id).await.unwrap());
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let store = MemoryStore::<GasReading>::new();
        let clone = store.clone();

        let r = gas(0, 42);
        store.insert(&r).await.unwrap();

        assert_eq!(clone.find_by_id(r.id).await.unwrap(), Some(r));
    }
}
