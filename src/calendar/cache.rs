//! Short-lived key/value cache for values that are cheap to lose.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= ttl
    }
}

/// Cache whose entries expire `ttl` after they were written.
///
/// Expired entries are treated as absent and dropped by the next read or
/// write of their key.
#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut entries = self.lock();

        if entries.get(key)?.is_expired(self.ttl, now) {
            entries.remove(key);
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn insert_at(&self, key: impl Into<String>, value: V, now: Instant) {
        self.lock().insert(
            key.into(),
            CacheEntry {
                value,
                inserted_at: now,
            },
        );
    }

    pub fn remove_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();

        entries.retain(|_, entry| !entry.is_expired(self.ttl, now));

        before - entries.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_value_within_ttl() {
        let cache = TtlCache::new(Duration::from_secs(60));

        cache.insert("AAPL", 187.5);

        assert_eq!(cache.get("AAPL"), Some(187.5));
        assert_eq!(cache.get("MSFT"), None);
    }

    #[test]
    fn expired_entries_are_absent_and_evicted() {
        let cache = TtlCache::new(Duration::from_secs(10));
        let written = Instant::now();

        cache.insert_at("k", "v", written);

        assert_eq!(cache.get_at("k", written + Duration::from_secs(9)), Some("v"));
        assert_eq!(cache.get_at("k", written + Duration::from_secs(10)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn rewriting_a_key_restarts_its_lifetime() {
        let cache = TtlCache::new(Duration::from_secs(10));
        let start = Instant::now();

        cache.insert_at("k", 1, start);
        cache.insert_at("k", 2, start + Duration::from_secs(8));

        assert_eq!(cache.get_at("k", start + Duration::from_secs(12)), Some(2));
    }

    #[test]
    fn remove_expired_drops_only_stale_entries() {
        let cache = TtlCache::new(Duration::from_millis(30));

        cache.insert_at("old", 1, Instant::now() - Duration::from_millis(50));
        cache.insert("new", 2);

        assert_eq!(cache.remove_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("new"), Some(2));
    }
}
