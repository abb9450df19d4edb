//! Key → value cache with per-entry timestamps.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;

/// Entries older than `ttl` are treated as absent.
///
/// The caller supplies `now` so expiry is deterministic under test.
#[derive(Debug, Clone)]
pub struct TimedCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (V, DateTime<Utc>)>,
}

impl<K: Eq + Hash, V> TimedCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn with_ttl_minutes(minutes: i64) -> Self {
        Self::new(Duration::minutes(minutes))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, if any.
    pub fn get(&self, key: &K, now: DateTime<Utc>) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|(_, stored)| now - *stored < self.ttl)
            .map(|(value, _)| value)
    }

    pub fn insert(&mut self, key: K, value: V, now: DateTime<Utc>) {
        self.entries.insert(key, (value, now));
    }

    /// Drop expired entries and return how many were removed.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, (_, stored)| now - *stored < ttl);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expires_after_ttl() {
        let now = Utc::now();
        let mut cache = TimedCache::with_ttl_minutes(15);
        cache.insert("AAPL", 175.0, now);

        assert_eq!(cache.get(&"AAPL", now + Duration::minutes(14)), Some(&175.0));
        assert_eq!(cache.get(&"AAPL", now + Duration::minutes(15)), None);
        assert_eq!(cache.get(&"MSFT", now), None);
    }

    #[test]
    fn test_insert_refreshes_timestamp() {
        let now = Utc::now();
        let mut cache = TimedCache::with_ttl_minutes(15);
        cache.insert("AAPL", 1.0, now);
        cache.insert("AAPL", 2.0, now + Duration::minutes(10));

        assert_eq!(cache.get(&"AAPL", now + Duration::minutes(20)), Some(&2.0));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let now = Utc::now();
        let mut cache = TimedCache::with_ttl_minutes(5);
        cache.insert("OLD", 1, now);
        cache.insert("NEW", 2, now + Duration::minutes(4));

        assert_eq!(cache.purge_expired(now + Duration::minutes(6)), 1);
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_empty());
    }
}
