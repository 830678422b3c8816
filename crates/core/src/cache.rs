//! Time-bounded result cache keyed by normalized search requests.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_TTL_SECS: u64 = 60;

/// The cache identity of a search: two logically equal requests produce
/// equal keys regardless of retailer order, query casing or padding.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SearchCacheKey {
    pub query: String,
    pub retailers: Vec<String>,
    pub page_size: u32,
    pub page: u32,
    pub sort: String,
    pub health_filter: String,
}

impl SearchCacheKey {
    pub fn new<I, R>(
        query: &str,
        retailers: I,
        page_size: u32,
        page: u32,
        sort: Option<&str>,
        health_filter: Option<&str>,
    ) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let retailers: BTreeSet<String> = retailers.into_iter().map(Into::into).collect();
        Self {
            query: query.trim().to_lowercase(),
            retailers: retailers.into_iter().collect(),
            page_size,
            page,
            sort: sort.unwrap_or_default().to_string(),
            health_filter: health_filter.unwrap_or("all").to_string(),
        }
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Hand-driven clock for expiry tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct Entry<V> {
    stored_at: DateTime<Utc>,
    value: V,
}

/// TTL cache with lazy eviction: stale entries are dropped when read, never
/// swept in the background.
pub struct ResultCache<V, K = SearchCacheKey> {
    ttl: Duration,
    clock: Box<dyn Clock>,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<V: Clone, K: Eq + Hash> ResultCache<V, K> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }

    pub fn with_clock(ttl: Duration, clock: impl Clock + 'static) -> Self {
        Self { ttl, clock: Box::new(clock), entries: Mutex::new(HashMap::new()) }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let stale = match entries.get(key) {
            None => return None,
            Some(entry) => now - entry.stored_at > self.ttl,
        };
        if stale {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: K, value: V) {
        let stored_at = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, Entry { stored_at, value });
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Entries currently held, stale ones included until they are read.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V, K> std::fmt::Debug for ResultCache<V, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}
