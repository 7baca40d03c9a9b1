use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use super::cache::TtlCache;
use super::event::{Event, Importance};
use super::partition::{MonthKey, MonthPartition};
use super::rate_limit::RateLimiter;

/// Filters applied by [`EventStore::events_in_range`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub currency: Option<String>,
    pub importance: Option<HashSet<Importance>>,
}

impl EventFilter {
    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn importance(mut self, importance: impl IntoIterator<Item = Importance>) -> Self {
        self.importance = Some(importance.into_iter().collect());
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        self.currency.as_ref().is_none_or(|currency| event.currency == *currency)
            && self
                .importance
                .as_ref()
                .is_none_or(|wanted| wanted.contains(&event.importance))
    }
}

#[derive(Debug, Clone, Default)]
struct Months {
    previous: Arc<MonthPartition>,
    current: Arc<MonthPartition>,
    next: Arc<MonthPartition>,
    refreshed_at: Option<NaiveDateTime>,
}

impl Months {
    const fn get(&self, key: MonthKey) -> &Arc<MonthPartition> {
        match key {
            MonthKey::Previous => &self.previous,
            MonthKey::Current => &self.current,
            MonthKey::Next => &self.next,
        }
    }

    fn set(&mut self, key: MonthKey, partition: Arc<MonthPartition>) {
        match key {
            MonthKey::Previous => self.previous = partition,
            MonthKey::Current => self.current = partition,
            MonthKey::Next => self.next = partition,
        }
    }

    fn events_for_date(&self, date: NaiveDate) -> &[Event] {
        MonthKey::PRECEDENCE
            .into_iter()
            .filter_map(|key| self.get(key).get(date))
            .find(|events| !events.is_empty())
            .unwrap_or_default()
    }
}

/// In-memory home of the extracted calendar.
///
/// Holds the previous, current and next month as immutable snapshots plus a
/// generic TTL cache. Readers clone the snapshot `Arc`s and never see a
/// partition that is still being written.
#[derive(Debug)]
pub struct EventStore<V = serde_json::Value> {
    months: RwLock<Months>,
    cache: TtlCache<V>,
    write_limiter: Arc<RateLimiter>,
}

impl<V: Clone> EventStore<V> {
    pub fn new(cache_ttl: Duration, write_limiter: Arc<RateLimiter>) -> Self {
        Self {
            months: RwLock::new(Months::default()),
            cache: TtlCache::new(cache_ttl),
            write_limiter,
        }
    }

    pub fn store_month(&self, key: MonthKey, partition: MonthPartition) {
        log::debug!(
            partition:% = key, days = partition.len_days(), events = partition.len_events();
            "Storing partition"
        );

        let partition = Arc::new(partition);
        self.write().set(key, partition);
    }

    /// Publishes the result of a refresh cycle in one step.
    ///
    /// Only the given keys are replaced, the scheduler always passes all three.
    pub fn publish(&self, partitions: Vec<(MonthKey, MonthPartition)>, refreshed_at: NaiveDateTime) {
        let partitions: Vec<_> = partitions
            .into_iter()
            .map(|(key, partition)| (key, Arc::new(partition)))
            .collect();

        let mut months = self.write();
        for (key, partition) in partitions {
            months.set(key, partition);
        }
        months.refreshed_at = Some(refreshed_at);
    }

    pub fn get_month(&self, key: MonthKey) -> Arc<MonthPartition> {
        Arc::clone(self.read().get(key))
    }

    pub fn refreshed_at(&self) -> Option<NaiveDateTime> {
        self.read().refreshed_at
    }

    /// Events of a day, taken from the first partition that has any.
    /// Lookup order is current, next, previous.
    pub fn events_for_date(&self, date: NaiveDate) -> Vec<Event> {
        self.snapshot().events_for_date(date).to_vec()
    }

    /// Events of every day in `start..=end` that pass `filter`.
    /// Days left without events are not part of the result.
    pub fn events_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        filter: &EventFilter,
    ) -> BTreeMap<NaiveDate, Vec<Event>> {
        let months = self.snapshot();

        start
            .iter_days()
            .take_while(|date| *date <= end)
            .filter_map(|date| {
                let events: Vec<Event> = months
                    .events_for_date(date)
                    .iter()
                    .filter(|event| filter.matches(event))
                    .cloned()
                    .collect();

                (!events.is_empty()).then_some((date, events))
            })
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.cache.get(key)
    }

    /// Caches `value`. Writes are throttled by the store's rate limiter.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.write_limiter.acquire();
        self.cache.insert(key, value);
    }

    pub const fn cache(&self) -> &TtlCache<V> {
        &self.cache
    }

    /// Drops every partition, the cached values and the refresh stamp.
    pub fn clear(&self) {
        *self.write() = Months::default();
        self.cache.clear();
    }

    fn snapshot(&self) -> Months {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Months> {
        self.months.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Months> {
        self.months.write().unwrap_or_else(PoisonError::into_inner)
    }
}
