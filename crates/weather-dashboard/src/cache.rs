use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Freshness {
    pub age_secs: u64,
    pub is_fresh: bool,
}

/// Where a value returned by [`TtlCache::get_or_fetch`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Hit { age_secs: u64 },
    Miss,
}

/// Argument-keyed memo table with per-call expiry.
///
/// Only successful fetches are stored. The lock is released while `fetch`
/// runs, so concurrent misses on the same key each fetch and the later
/// insert replaces the earlier one.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_fetch<E, F>(
        &self,
        key: K,
        ttl_secs: u64,
        now: DateTime<Utc>,
        fetch: F,
    ) -> Result<(V, Lookup), E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some((value, age_secs)) = self.get_fresh(&key, ttl_secs, now) {
            return Ok((value, Lookup::Hit { age_secs }));
        }

        let value = fetch()?;
        self.entries.lock().insert(
            key,
            CacheEntry {
                value: value.clone(),
                fetched_at: now,
            },
        );
        Ok((value, Lookup::Miss))
    }

    pub fn get_fresh(&self, key: &K, ttl_secs: u64, now: DateTime<Utc>) -> Option<(V, u64)> {
        let entries = self.entries.lock();
        let entry = entries.get(key)?;
        let freshness = evaluate_freshness(entry.fetched_at, now, ttl_secs);
        freshness
            .is_fresh
            .then(|| (entry.value.clone(), freshness.age_secs))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry whose window has closed.
    pub fn purge_expired(&self, ttl_secs: u64, now: DateTime<Utc>) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| evaluate_freshness(entry.fetched_at, now, ttl_secs).is_fresh);
        before - entries.len()
    }
}

pub fn evaluate_freshness(fetched_at: DateTime<Utc>, now: DateTime<Utc>, ttl_secs: u64) -> Freshness {
    let age_secs = now
        .signed_duration_since(fetched_at)
        .num_seconds()
        .max(0)
        .try_into()
        .unwrap_or(u64::MAX);

    Freshness {
        age_secs,
        is_fresh: age_secs < ttl_secs,
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, 12, minute, second)
            .single()
            .expect("time")
    }

    #[test]
    fn cache_freshness_marks_record_as_fresh_within_ttl() {
        let result = evaluate_freshness(at(0, 0), at(4, 0), 300);
        assert_eq!(result.age_secs, 240);
        assert!(result.is_fresh);
    }

    #[test]
    fn cache_freshness_expires_at_ttl_boundary() {
        let result = evaluate_freshness(at(0, 0), at(5, 0), 300);
        assert_eq!(result.age_secs, 300);
        assert!(!result.is_fresh);
    }

    #[test]
    fn cache_freshness_clamps_clock_skew_to_zero_age() {
        let result = evaluate_freshness(at(5, 0), at(0, 0), 300);
        assert_eq!(result.age_secs, 0);
        assert!(result.is_fresh);
    }

    #[test]
    fn cache_get_or_fetch_reuses_value_within_window() {
        let cache = TtlCache::<&str, u32>::new();
        let calls = Cell::new(0);
        let fetch = || -> Result<u32, ()> {
            calls.set(calls.get() + 1);
            Ok(7)
        };

        let first = cache.get_or_fetch("k", 600, at(0, 0), fetch).expect("first");
        let second = cache.get_or_fetch("k", 600, at(9, 59), fetch).expect("second");

        assert_eq!(first, (7, Lookup::Miss));
        assert_eq!(second, (7, Lookup::Hit { age_secs: 599 }));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn cache_get_or_fetch_refetches_after_expiry() {
        let cache = TtlCache::<&str, u32>::new();
        let calls = Cell::new(0);
        let fetch = || -> Result<u32, ()> {
            calls.set(calls.get() + 1);
            Ok(calls.get())
        };

        cache.get_or_fetch("k", 600, at(0, 0), fetch).expect("first");
        let (value, lookup) = cache
            .get_or_fetch("k", 600, at(0, 0) + Duration::seconds(600), fetch)
            .expect("second");

        assert_eq!(value, 2);
        assert_eq!(lookup, Lookup::Miss);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cache_does_not_store_failed_fetches() {
        let cache = TtlCache::<&str, u32>::new();
        let calls = Cell::new(0);

        let error = cache
            .get_or_fetch("k", 600, at(0, 0), || {
                calls.set(calls.get() + 1);
                Err::<u32, _>("down")
            })
            .expect_err("must fail");
        assert_eq!(error, "down");
        assert!(cache.is_empty());

        let (value, lookup) = cache
            .get_or_fetch("k", 600, at(0, 1), || {
                calls.set(calls.get() + 1);
                Ok::<_, &str>(3)
            })
            .expect("retry on next call");
        assert_eq!((value, lookup), (3, Lookup::Miss));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn cache_keys_are_independent() {
        let cache = TtlCache::<(&str, &str), &str>::new();
        cache
            .get_or_fetch(("London", "UK"), 3600, at(0, 0), || Ok::<_, ()>("uk"))
            .expect("london uk");
        let (value, lookup) = cache
            .get_or_fetch(("London", "Canada"), 3600, at(0, 1), || Ok::<_, ()>("ca"))
            .expect("london ca");

        assert_eq!(value, "ca");
        assert_eq!(lookup, Lookup::Miss);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn cache_purge_expired_drops_only_stale_entries() {
        let cache = TtlCache::<u8, u8>::new();
        cache.get_or_fetch(1, 60, at(0, 0), || Ok::<_, ()>(1)).expect("one");
        cache.get_or_fetch(2, 60, at(1, 30), || Ok::<_, ()>(2)).expect("two");

        assert_eq!(cache.purge_expired(60, at(2, 0)), 1);
        assert_eq!(cache.get_fresh(&2, 60, at(2, 0)), Some((2, 30)));
    }
}
