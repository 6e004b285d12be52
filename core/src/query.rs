//! Query cache: memoizes reads by key, coalesces concurrent loads of the
//! same key and invalidates on demand.
//!
//! # Design
//! Values are stored as `Arc<dyn Any>` so one cache holds every query type;
//! a fresh hit hands back the same `Arc`. Each entry tracks an in-flight
//! flag and a generation counter. Only one loader runs per key at a time:
//! other callers wait on the condvar and reuse its result. `invalidate`
//! bumps the generation, so a load that started earlier stores its value as
//! stale instead of fresh.

use std::any::Any;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

/// Stable identifier of one cached read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Cow<'static, str>);

impl QueryKey {
    pub const TRAINERS: QueryKey = QueryKey(Cow::Borrowed("trainers"));
    pub const CURRENT_USER: QueryKey = QueryKey(Cow::Borrowed("currentUser"));
    pub const ALL_PRODUCTS: QueryKey = QueryKey(Cow::Borrowed("allProducts"));

    pub fn new(key: impl Into<Cow<'static, str>>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Observable state of one key, for rendering without blocking.
#[derive(Debug)]
pub enum QueryState<T> {
    /// Never loaded and not loading.
    Idle,
    /// First load in progress.
    Loading,
    Ready(Arc<T>),
    /// A value exists but the next fetch reloads it. `refreshing` is set
    /// while that reload runs.
    Stale { value: Arc<T>, refreshing: bool },
}

impl<T> QueryState<T> {
    /// Last value, fresh or stale.
    pub fn value(&self) -> Option<&Arc<T>> {
        match self {
            QueryState::Ready(value) | QueryState::Stale { value, .. } => Some(value),
            QueryState::Idle | QueryState::Loading => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            QueryState::Loading | QueryState::Stale { refreshing: true, .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub fresh: usize,
    pub stale: usize,
    pub in_flight: usize,
}

type Payload = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct Entry {
    value: Option<Payload>,
    stored_at: Option<Instant>,
    stale: bool,
    in_flight: bool,
    generation: u64,
}

impl Entry {
    fn is_fresh(&self, max_age: Option<Duration>) -> bool {
        if self.value.is_none() || self.stale {
            return false;
        }
        match (max_age, self.stored_at) {
            (Some(max_age), Some(stored_at)) => stored_at.elapsed() <= max_age,
            _ => true,
        }
    }
}

pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    settled: Condvar,
    max_age: Option<Duration>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    /// Cache whose entries stay fresh until invalidated.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            settled: Condvar::new(),
            max_age: None,
        }
    }

    /// Cache whose entries also go stale `max_age` after they were stored.
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            max_age: Some(max_age),
            ..Self::new()
        }
    }

    /// Return the fresh value for `key`, or run `loader` and store its
    /// result. Errors are returned to the caller and never cached.
    pub fn fetch<T, E, F>(&self, key: &QueryKey, loader: F) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        let generation = {
            let mut entries = self.lock();
            loop {
                let entry = entries.entry(key.clone()).or_default();
                if entry.is_fresh(self.max_age) {
                    if let Some(value) = entry.value.clone().and_then(downcast::<T>) {
                        debug!(key = %key, "query cache hit");
                        return Ok(value);
                    }
                }
                if !entry.in_flight {
                    entry.in_flight = true;
                    break entry.generation;
                }
                debug!(key = %key, "waiting for in-flight load");
                entries = self
                    .settled
                    .wait(entries)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        debug!(key = %key, "query cache miss, loading");
        let guard = InFlight { cache: self, key };
        let result = loader();
        let mut entries = self.lock();
        let entry = entries.entry(key.clone()).or_default();
        let outcome = result.map(|value| {
            let value = Arc::new(value);
            entry.value = Some(value.clone() as Payload);
            entry.stored_at = Some(Instant::now());
            entry.stale = entry.generation != generation;
            if entry.stale {
                debug!(key = %key, "invalidated during load, stored as stale");
            }
            value
        });
        entry.in_flight = false;
        drop(entries);
        std::mem::forget(guard);
        self.settled.notify_all();
        outcome
    }

    /// Mark `key` stale so the next fetch reloads it. The current value
    /// stays readable through `peek`.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(key) {
            entry.stale = true;
            entry.generation += 1;
            debug!(key = %key, "query invalidated");
        }
    }

    /// Invalidate every key starting with `prefix`. Returns how many keys
    /// were marked.
    pub fn invalidate_matching(&self, prefix: &str) -> usize {
        let mut entries = self.lock();
        let mut marked = 0;
        for (key, entry) in entries.iter_mut() {
            if key.as_str().starts_with(prefix) {
                entry.stale = true;
                entry.generation += 1;
                marked += 1;
            }
        }
        marked
    }

    /// Non-blocking view of `key`.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        let entries = self.lock();
        let Some(entry) = entries.get(key) else {
            return QueryState::Idle;
        };
        let fresh = entry.is_fresh(self.max_age);
        match entry.value.clone().and_then(downcast::<T>) {
            Some(value) if fresh => QueryState::Ready(value),
            Some(value) => QueryState::Stale {
                value,
                refreshing: entry.in_flight,
            },
            None if entry.in_flight => QueryState::Loading,
            None => QueryState::Idle,
        }
    }

    /// Store `value` as fresh without a loader.
    pub fn set<T: Send + Sync + 'static>(&self, key: &QueryKey, value: T) -> Arc<T> {
        let value = Arc::new(value);
        let mut entries = self.lock();
        let entry = entries.entry(key.clone()).or_default();
        entry.value = Some(value.clone() as Payload);
        entry.stored_at = Some(Instant::now());
        entry.stale = false;
        entry.generation += 1;
        value
    }

    /// Drop the value of `key`. A load in flight keeps running and stores
    /// its result as stale.
    pub fn remove(&self, key: &QueryKey) {
        let mut entries = self.lock();
        if let Some(entry) = entries.get_mut(key) {
            if entry.in_flight {
                entry.value = None;
                entry.stale = true;
                entry.generation += 1;
            } else {
                entries.remove(key);
            }
        }
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.retain(|_, entry| entry.in_flight);
        for entry in entries.values_mut() {
            entry.value = None;
            entry.stale = true;
            entry.generation += 1;
        }
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.lock();
        let mut stats = CacheStats {
            entries: entries.len(),
            fresh: 0,
            stale: 0,
            in_flight: 0,
        };
        for entry in entries.values() {
            if entry.is_fresh(self.max_age) {
                stats.fresh += 1;
            } else if entry.value.is_some() {
                stats.stale += 1;
            }
            if entry.in_flight {
                stats.in_flight += 1;
            }
        }
        stats
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn downcast<T: Send + Sync + 'static>(payload: Payload) -> Option<Arc<T>> {
    payload.downcast::<T>().ok()
}

/// Clears the in-flight flag if a loader unwinds.
struct InFlight<'a> {
    cache: &'a QueryCache,
    key: &'a QueryKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut entries = self.cache.lock();
        if let Some(entry) = entries.get_mut(self.key) {
            entry.in_flight = false;
        }
        drop(entries);
        self.cache.settled.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn counted(calls: &AtomicUsize, value: &'static str) -> Result<String, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value.to_string())
    }

    #[test]
    fn second_fetch_returns_same_arc_without_loading() {
        let cache = QueryCache::new();
        let calls = AtomicUsize::new(0);
        let first = cache
            .fetch(&QueryKey::CURRENT_USER, || counted(&calls, "alice"))
            .unwrap();
        let second = cache
            .fetch(&QueryKey::CURRENT_USER, || counted(&calls, "bob"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidate_forces_exactly_one_reload() {
        let cache = QueryCache::new();
        let calls = AtomicUsize::new(0);
        cache.fetch(&QueryKey::CURRENT_USER, || counted(&calls, "v1")).unwrap();
        cache.invalidate(&QueryKey::CURRENT_USER);
        let reloaded = cache
            .fetch(&QueryKey::CURRENT_USER, || counted(&calls, "v2"))
            .unwrap();
        cache.fetch(&QueryKey::CURRENT_USER, || counted(&calls, "v3")).unwrap();
        assert_eq!(reloaded.as_str(), "v2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn errors_are_not_cached() {
        let cache = QueryCache::new();
        let failed: Result<Arc<String>, String> =
            cache.fetch(&QueryKey::TRAINERS, || Err("offline".to_string()));
        assert_eq!(failed.unwrap_err(), "offline");
        assert!(matches!(cache.peek::<String>(&QueryKey::TRAINERS), QueryState::Idle));
        let value = cache
            .fetch::<_, String, _>(&QueryKey::TRAINERS, || Ok("back".to_string()))
            .unwrap();
        assert_eq!(value.as_str(), "back");
    }

    #[test]
    fn failed_reload_keeps_previous_value_stale() {
        let cache = QueryCache::new();
        cache
            .fetch::<_, String, _>(&QueryKey::ALL_PRODUCTS, || Ok("v1".to_string()))
            .unwrap();
        cache.invalidate(&QueryKey::ALL_PRODUCTS);
        let _ = cache.fetch::<String, _, _>(&QueryKey::ALL_PRODUCTS, || Err("boom"));
        match cache.peek::<String>(&QueryKey::ALL_PRODUCTS) {
            QueryState::Stale { value, refreshing } => {
                assert_eq!(value.as_str(), "v1");
                assert!(!refreshing);
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn concurrent_fetches_share_one_load() {
        let cache = Arc::new(QueryCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                thread::spawn(move || {
                    cache
                        .fetch::<_, String, _>(&QueryKey::TRAINERS, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            Ok(vec!["coach".to_string()])
                        })
                        .unwrap()
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[test]
    fn invalidate_during_load_leaves_entry_stale() {
        let cache = QueryCache::new();
        let value = cache
            .fetch::<_, String, _>(&QueryKey::CURRENT_USER, || {
                cache.invalidate(&QueryKey::CURRENT_USER);
                Ok("racing".to_string())
            })
            .unwrap();
        assert_eq!(value.as_str(), "racing");
        assert!(matches!(
            cache.peek::<String>(&QueryKey::CURRENT_USER),
            QueryState::Stale { .. }
        ));
    }

    #[test]
    fn panicking_loader_does_not_wedge_the_key() {
        let cache = Arc::new(QueryCache::new());
        let worker = cache.clone();
        let outcome = thread::spawn(move || {
            let _ = worker.fetch::<String, String, _>(&QueryKey::TRAINERS, || panic!("loader bug"));
        })
        .join();
        assert!(outcome.is_err());
        assert_eq!(cache.stats().in_flight, 0);
        let value = cache
            .fetch::<_, String, _>(&QueryKey::TRAINERS, || Ok("recovered".to_string()))
            .unwrap();
        assert_eq!(value.as_str(), "recovered");
    }

    #[test]
    fn max_age_expires_entries() {
        let cache = QueryCache::with_max_age(Duration::from_millis(20));
        let calls = AtomicUsize::new(0);
        cache.fetch(&QueryKey::ALL_PRODUCTS, || counted(&calls, "v1")).unwrap();
        thread::sleep(Duration::from_millis(40));
        cache.fetch(&QueryKey::ALL_PRODUCTS, || counted(&calls, "v2")).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalidate_matching_uses_prefix() {
        let cache = QueryCache::new();
        cache.set(&QueryKey::new("product:1"), 1u32);
        cache.set(&QueryKey::new("product:2"), 2u32);
        cache.set(&QueryKey::TRAINERS, 3u32);
        assert_eq!(cache.invalidate_matching("product:"), 2);
        let stats = cache.stats();
        assert_eq!(stats.entries, 3);
        assert_eq!(stats.fresh, 1);
        assert_eq!(stats.stale, 2);
    }

    #[test]
    fn peek_with_wrong_type_is_idle() {
        let cache = QueryCache::new();
        cache.set(&QueryKey::TRAINERS, 7u32);
        assert!(matches!(cache.peek::<String>(&QueryKey::TRAINERS), QueryState::Idle));
        assert!(matches!(cache.peek::<u32>(&QueryKey::TRAINERS), QueryState::Ready(_)));
    }

    #[test]
    fn remove_and_clear_drop_values() {
        let cache = QueryCache::new();
        cache.set(&QueryKey::TRAINERS, 1u8);
        cache.set(&QueryKey::ALL_PRODUCTS, 2u8);
        cache.remove(&QueryKey::TRAINERS);
        assert!(matches!(cache.peek::<u8>(&QueryKey::TRAINERS), QueryState::Idle));
        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }
}
