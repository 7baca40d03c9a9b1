use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use chrono::{NaiveDateTime, TimeDelta};

use super::extractor::Extractor;
use super::months::{months_needed, YearMonth};
use super::partition::{MonthKey, MonthPartition};
use super::rate_limit::RateLimiter;
use super::store::EventStore;

/// When the store counts as stale and which neighbour months to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub interval: TimeDelta,
    pub boundary_days: u32,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: TimeDelta::hours(24),
            boundary_days: 7,
        }
    }
}

/// Keeps the [`EventStore`] populated from an [`Extractor`].
///
/// Only one refresh runs at a time. Callers that arrive while a refresh is in
/// flight wait for it and then reuse its result instead of fetching again.
#[derive(Debug)]
pub struct RefreshScheduler<E, V = serde_json::Value> {
    extractor: E,
    store: Arc<EventStore<V>>,
    limiter: Arc<RateLimiter>,
    policy: RefreshPolicy,
    in_flight: Mutex<()>,
}

impl<E: Extractor, V: Clone> RefreshScheduler<E, V> {
    pub fn new(
        extractor: E,
        store: Arc<EventStore<V>>,
        limiter: Arc<RateLimiter>,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            extractor,
            store,
            limiter,
            policy,
            in_flight: Mutex::new(()),
        }
    }

    pub const fn extractor(&self) -> &E {
        &self.extractor
    }

    pub const fn store(&self) -> &Arc<EventStore<V>> {
        &self.store
    }

    pub const fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn is_stale(&self, now: NaiveDateTime) -> bool {
        self.store.refreshed_at().is_none_or(|at| {
            now - at >= self.policy.interval || YearMonth::of(now.date()) != YearMonth::of(at.date())
        })
    }

    /// Refreshes the store if it is stale.
    ///
    /// Returns `true` when the store holds fresh data afterwards, `false` when
    /// the refresh failed. A failed refresh leaves the previous partitions in
    /// place.
    pub fn ensure_fresh(&self, now: NaiveDateTime) -> bool {
        if !self.is_stale(now) {
            return true;
        }

        let _guard = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        if !self.is_stale(now) {
            log::debug!("Store was refreshed while waiting");
            return true;
        }

        self.refresh(now)
    }

    /// Refreshes the store whether it is stale or not.
    pub fn force_refresh(&self, now: NaiveDateTime) -> bool {
        let _guard = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        self.refresh(now)
    }

    fn refresh(&self, now: NaiveDateTime) -> bool {
        let today = now.date();
        let needed = months_needed(today, self.policy.boundary_days);
        let mut fetched: Vec<(MonthKey, MonthPartition)> = Vec::with_capacity(needed.len());

        for (key, month) in needed {
            let Some(chrono_month) = month.chrono_month() else {
                log::error!("Invalid month {month:?} for {key}");
                return false;
            };

            self.limiter.acquire();

            match self.extractor.extract(chrono_month, month.year) {
                Ok(partition) => fetched.push((key, partition)),
                Err(failure) => {
                    log::error!(
                        partition:% = key, reason:? = failure.reason;
                        "Refresh failed, keeping previous data: {failure}"
                    );
                    return false;
                }
            }
        }

        // Every cycle replaces all three partitions so none outlives its month.
        let previous = take(&mut fetched, MonthKey::Previous)
            .or_else(|| self.rolled_over_current(now))
            .unwrap_or_default();
        let current = take(&mut fetched, MonthKey::Current).unwrap_or_default();
        let next = take(&mut fetched, MonthKey::Next).unwrap_or_default();
        let partitions = vec![
            (MonthKey::Previous, previous),
            (MonthKey::Current, current),
            (MonthKey::Next, next),
        ];

        log::info!(
            "Refreshed partitions, {} events",
            partitions.iter().map(|(_, p)| p.len_events()).sum::<usize>(),
        );

        self.store.publish(partitions, now);

        true
    }

    /// The stored current month, if it has just become the previous one.
    fn rolled_over_current(&self, now: NaiveDateTime) -> Option<MonthPartition> {
        let refreshed = YearMonth::of(self.store.refreshed_at()?.date());
        if refreshed != YearMonth::of(now.date()).prev() {
            return None;
        }

        let current = self.store.get_month(MonthKey::Current);
        (!current.is_empty()).then(|| MonthPartition::clone(&current))
    }
}

fn take(fetched: &mut Vec<(MonthKey, MonthPartition)>, key: MonthKey) -> Option<MonthPartition> {
    let index = fetched.iter().position(|(k, _)| *k == key)?;

    Some(fetched.swap_remove(index).1)
}

impl<E, V> RefreshScheduler<E, V>
where
    E: Extractor + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Runs [`Self::ensure_fresh`] on its own thread.
    ///
    /// The refresh finishes even if the caller drops the handle.
    pub fn spawn_refresh(self: &Arc<Self>, now: NaiveDateTime) -> JoinHandle<bool> {
        let scheduler = Arc::clone(self);

        std::thread::spawn(move || scheduler.ensure_fresh(now))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::{Month, NaiveDate};

    use super::*;
    use crate::calendar::{Event, ExtractionFailure};

    #[derive(Default)]
    struct CountingExtractor {
        calls: AtomicUsize,
        months: Mutex<Vec<(Month, i32)>>,
    }

    impl Extractor for CountingExtractor {
        fn extract(&self, month: Month, year: i32) -> Result<MonthPartition, ExtractionFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.months.lock().unwrap().push((month, year));
            std::thread::sleep(Duration::from_millis(20));

            let date = NaiveDate::from_ymd_opt(year, month.number_from_month(), 10).unwrap();
            Ok([Event::new(date, month.name())].into_iter().collect())
        }
    }

    struct FailingExtractor;

    impl Extractor for FailingExtractor {
        fn extract(&self, _month: Month, _year: i32) -> Result<MonthPartition, ExtractionFailure> {
            Err(ExtractionFailure::timeout("calendar table", Duration::from_secs(10)))
        }
    }

    fn at(m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn scheduler<E: Extractor>(extractor: E) -> RefreshScheduler<E, u32> {
        let limiter = Arc::new(RateLimiter::new(Duration::ZERO));
        let store = Arc::new(EventStore::new(Duration::from_secs(60), Arc::clone(&limiter)));

        RefreshScheduler::new(extractor, store, limiter, RefreshPolicy::default())
    }

    #[test]
    fn empty_store_is_stale() {
        let scheduler = scheduler(CountingExtractor::default());

        assert!(scheduler.is_stale(at(10, 15, 9)));
    }

    #[test]
    fn refreshes_once_per_interval() {
        let scheduler = scheduler(CountingExtractor::default());

        assert!(scheduler.ensure_fresh(at(10, 15, 9)));
        assert!(scheduler.ensure_fresh(at(10, 15, 20)));
        assert_eq!(scheduler.extractor.calls.load(Ordering::SeqCst), 1);

        assert!(scheduler.ensure_fresh(at(10, 16, 9)));
        assert_eq!(scheduler.extractor.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn month_change_makes_the_store_stale() {
        let scheduler = scheduler(CountingExtractor::default());
        scheduler.ensure_fresh(at(10, 31, 22));

        assert!(scheduler.is_stale(at(11, 1, 1)));
    }

    #[test]
    fn boundary_days_fetch_neighbour_months() {
        let scheduler = scheduler(CountingExtractor::default());

        assert!(scheduler.ensure_fresh(at(10, 28, 9)));

        let months = scheduler.extractor.months.lock().unwrap().clone();
        assert_eq!(months, [(Month::October, 2026), (Month::November, 2026)]);
        assert!(!scheduler.store().get_month(MonthKey::Next).is_empty());
        assert!(scheduler.store().get_month(MonthKey::Previous).is_empty());
    }

    #[test]
    fn failed_refresh_keeps_previous_partitions() {
        let limiter = Arc::new(RateLimiter::new(Duration::ZERO));
        let store: Arc<EventStore<u32>> = Arc::new(EventStore::new(Duration::from_secs(60), Arc::clone(&limiter)));
        let good = RefreshScheduler::new(CountingExtractor::default(), Arc::clone(&store), Arc::clone(&limiter), RefreshPolicy::default());
        assert!(good.ensure_fresh(at(10, 15, 9)));
        let before = store.get_month(MonthKey::Current);

        let failing = RefreshScheduler::new(FailingExtractor, Arc::clone(&store), limiter, RefreshPolicy::default());

        assert!(!failing.ensure_fresh(at(10, 16, 9)));
        assert_eq!(store.get_month(MonthKey::Current), before);
        assert_eq!(store.refreshed_at(), Some(at(10, 15, 9)));
    }

    #[test]
    fn concurrent_triggers_collapse_into_one_fetch() {
        let scheduler = Arc::new(scheduler(CountingExtractor::default()));

        let handles: Vec<_> = (0..4).map(|_| scheduler.spawn_refresh(at(10, 15, 9))).collect();

        assert!(handles.into_iter().all(|handle| handle.join().unwrap()));
        assert_eq!(scheduler.extractor.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn force_refresh_ignores_staleness() {
        let scheduler = scheduler(CountingExtractor::default());
        scheduler.ensure_fresh(at(10, 15, 9));

        assert!(scheduler.force_refresh(at(10, 15, 10)));
        assert_eq!(scheduler.extractor.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn rollover_keeps_old_current_as_previous() {
        let limiter = Arc::new(RateLimiter::new(Duration::ZERO));
        let store: Arc<EventStore<u32>> = Arc::new(EventStore::new(Duration::from_secs(60), Arc::clone(&limiter)));
        let policy = RefreshPolicy {
            boundary_days: 0,
            ..RefreshPolicy::default()
        };
        let scheduler = RefreshScheduler::new(CountingExtractor::default(), Arc::clone(&store), limiter, policy);

        scheduler.ensure_fresh(at(10, 20, 9));
        scheduler.ensure_fresh(at(11, 2, 9));

        let previous = store.get_month(MonthKey::Previous);
        assert_eq!(previous.events().next().unwrap().name, "October");
        assert_eq!(scheduler.extractor.calls.load(Ordering::SeqCst), 2);
    }

    #[derive(Default)]
    struct VersionedExtractor {
        version: AtomicUsize,
    }

    impl Extractor for VersionedExtractor {
        fn extract(&self, month: Month, year: i32) -> Result<MonthPartition, ExtractionFailure> {
            let name = format!("{}-v{}", month.name(), self.version.load(Ordering::SeqCst));
            let date = NaiveDate::from_ymd_opt(year, month.number_from_month(), 10).unwrap();

            Ok([Event::new(date, name)].into_iter().collect())
        }
    }

    fn names(store: &EventStore<u32>, key: MonthKey) -> Vec<String> {
        store.get_month(key).events().map(|event| event.name.clone()).collect()
    }

    #[test]
    fn older_neighbour_months_never_outlive_their_cycle() {
        let scheduler = scheduler(VersionedExtractor::default());
        let store = Arc::clone(scheduler.store());
        let cycle = |version: usize, now: NaiveDateTime| {
            scheduler.extractor.version.store(version, Ordering::SeqCst);
            assert!(scheduler.ensure_fresh(now));
        };

        cycle(1, at(10, 28, 9));
        assert_eq!(names(&store, MonthKey::Next), ["November-v1"]);

        cycle(2, at(11, 15, 9));
        assert_eq!(names(&store, MonthKey::Previous), ["October-v1"]);
        assert_eq!(names(&store, MonthKey::Current), ["November-v2"]);
        assert!(store.get_month(MonthKey::Next).is_empty());

        cycle(3, at(12, 15, 9));
        assert_eq!(names(&store, MonthKey::Previous), ["November-v2"]);
        assert_eq!(names(&store, MonthKey::Current), ["December-v3"]);
        assert!(store.get_month(MonthKey::Next).is_empty());

        let november = store.events_for_date(NaiveDate::from_ymd_opt(2026, 11, 10).unwrap());
        assert_eq!(november[0].name, "November-v2");
    }

    #[test]
    fn rollover_skips_a_current_month_older_than_last_month() {
        let scheduler = scheduler(VersionedExtractor::default());

        scheduler.ensure_fresh(at(9, 15, 9));
        scheduler.ensure_fresh(at(11, 15, 9));

        assert!(scheduler.store().get_month(MonthKey::Previous).is_empty());
    }
}
