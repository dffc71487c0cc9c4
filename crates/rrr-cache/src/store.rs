//! Content-addressed, time-expiring cache store
//!
//! A bounded moka hot layer fronts a durable [`CacheBackend`]. Expiry is
//! always decided here against the injected [`Clock`]; the hot layer never
//! keeps an entry alive past the TTL.
//!
//! # Single flight
//!
//! [`CacheStore::get_or_compute`] guarantees at most one in-flight
//! computation per key. Concurrent misses queue on a per-key lock held in an
//! explicit in-flight table; each waiter re-checks the cache after acquiring
//! it and returns what the holder stored.

use crate::backend::{CacheBackend, SqliteBackend, StoredEntry};
use crate::clock::{Clock, SystemClock};
use crate::error::{CacheError, Result};
use crate::key::CacheKey;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use moka::future::Cache;
use moka::ops::compute::Op;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Seconds in a day
pub const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Default entry lifetime: three days
pub const DEFAULT_TTL: Duration = Duration::from_secs(3 * SECS_PER_DAY);

/// Default hot-layer capacity (entries)
pub const DEFAULT_HOT_CAPACITY: u64 = 256;

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
    /// Maximum entries held in memory
    pub hot_capacity: u64,
    /// Interval of the background purge task in seconds
    pub purge_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("cache/rrr_cache.db"),
            ttl_secs: DEFAULT_TTL.as_secs(),
            hot_capacity: DEFAULT_HOT_CAPACITY,
            purge_interval_secs: 60 * 60,
        }
    }
}

impl CacheConfig {
    /// Entry lifetime
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Background purge interval
    #[inline]
    #[must_use]
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs.max(1))
    }

    /// Set the database path
    #[inline]
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Set the entry lifetime
    #[inline]
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.as_secs();
        self
    }

    /// Set the hot-layer capacity
    #[inline]
    #[must_use]
    pub fn with_hot_capacity(mut self, capacity: u64) -> Self {
        self.hot_capacity = capacity;
        self
    }
}

/// A cached payload and when it was written
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    /// Entry key
    pub key: CacheKey,
    /// Stored payload
    pub payload: T,
    /// Insertion time
    pub created_at: DateTime<Utc>,
}

/// Whether a value came from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    /// Served from the cache
    Hit,
    /// Freshly computed
    Miss,
}

/// Result of [`CacheStore::get_or_compute`]
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    /// The value
    pub value: T,
    /// Hit or miss
    pub status: CacheStatus,
    /// When the value was produced
    pub created_at: DateTime<Utc>,
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that found nothing fresh
    pub misses: u64,
    /// Computations run by `get_or_compute`
    pub computations: u64,
    /// Entries dropped for exceeding the TTL
    pub expired: u64,
    /// Backend failures treated as misses or skipped writes
    pub degraded: u64,
    /// Approximate entries in the hot layer
    pub hot_entries: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
    expired: AtomicU64,
    degraded: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

type InflightTable = DashMap<CacheKey, Arc<Mutex<()>>>;

/// Holds a key's in-flight lock; leaves the table clean on drop
struct InflightSlot {
    table: Arc<InflightTable>,
    key: CacheKey,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl InflightSlot {
    async fn acquire(table: &Arc<InflightTable>, key: CacheKey) -> Self {
        let lock = Arc::clone(table.entry(key).or_default().value());
        let guard = Arc::clone(&lock).lock_owned().await;
        Self {
            table: Arc::clone(table),
            key,
            lock,
            guard: Some(guard),
        }
    }
}

impl Drop for InflightSlot {
    fn drop(&mut self) {
        self.guard.take();
        // The table and this slot hold the only references when nobody waits.
        self.table.remove_if(&self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}

/// Content-addressed cache with TTL expiry and single-flight computation
pub struct CacheStore<T> {
    backend: Arc<dyn CacheBackend>,
    hot: Cache<CacheKey, Arc<CacheEntry<T>>>,
    inflight: Arc<InflightTable>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    counters: Counters,
}

impl<T> fmt::Debug for CacheStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("backend", &self.backend)
            .field("ttl", &self.ttl)
            .field("inflight", &self.inflight.len())
            .finish_non_exhaustive()
    }
}

impl<T> CacheStore<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Store over `backend` using the system clock
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, config: &CacheConfig) -> Self {
        Self {
            backend,
            hot: Cache::new(config.hot_capacity),
            inflight: Arc::new(DashMap::new()),
            clock: Arc::new(SystemClock),
            ttl: config.ttl(),
            counters: Counters::default(),
        }
    }

    /// Store over the SQLite database named in `config`
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub fn open(config: &CacheConfig) -> Result<Self> {
        let backend = SqliteBackend::open(&config.db_path)?;
        Ok(Self::new(Arc::new(backend), config))
    }

    /// Replace the time source
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Entry lifetime
    #[inline]
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh entry for `key`, if any
    ///
    /// Backend failures are logged and reported as a miss. Expired entries
    /// are deleted on the way out.
    pub async fn get(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        let found = self.lookup(key).await;
        Counters::bump(if found.is_some() {
            &self.counters.hits
        } else {
            &self.counters.misses
        });
        found
    }

    /// Insert or replace the entry for `key`, stamped with the current time
    ///
    /// The hot layer is only updated once the durable write succeeds.
    ///
    /// # Errors
    /// Returns an error if the payload cannot be encoded or written.
    pub async fn put(&self, key: &CacheKey, payload: T) -> Result<CacheEntry<T>> {
        let created_at = self.clock.now();
        let stored = StoredEntry {
            payload: serde_json::to_string(&payload)?,
            created_at_ms: created_at.timestamp_millis(),
        };
        let k = *key;
        self.blocking(move |backend| backend.store(&k, &stored))
            .await?;

        let entry = CacheEntry {
            key: *key,
            payload,
            created_at,
        };
        self.hot.insert(*key, Arc::new(entry.clone())).await;
        Ok(entry)
    }

    /// Remove every entry older than the TTL; returns the number of rows
    ///
    /// # Errors
    /// Returns an error if the backend purge fails.
    pub async fn purge_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let stale: Vec<CacheKey> = self
            .hot
            .iter()
            .filter(|(_, entry)| !self.is_fresh(entry.created_at, now))
            .map(|(key, _)| *key)
            .collect();
        for key in &stale {
            self.hot.invalidate(key).await;
        }
        let cutoff = now.timestamp_millis().saturating_sub(self.ttl_millis());
        let purged = self
            .blocking(move |backend| backend.purge_older_than(cutoff))
            .await?;
        self.counters
            .expired
            .fetch_add(purged as u64, Ordering::Relaxed);
        tracing::debug!(purged, "purged expired cache entries");
        Ok(purged)
    }

    /// Return the cached value for `key`, or run `compute` and cache it
    ///
    /// Concurrent calls for the same key run `compute` at most once; the
    /// rest wait and receive the stored result. A failed computation caches
    /// nothing. A failed write is logged and the computed value is still
    /// returned; the next call for the key computes again.
    ///
    /// # Errors
    /// Returns whatever `compute` fails with.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &CacheKey,
        compute: F,
    ) -> std::result::Result<Cached<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(entry) = self.lookup(key).await {
            Counters::bump(&self.counters.hits);
            return Ok(Self::hit(entry));
        }

        let _slot = InflightSlot::acquire(&self.inflight, *key).await;

        if let Some(entry) = self.lookup(key).await {
            tracing::debug!(key = %key.short(), "served by concurrent computation");
            Counters::bump(&self.counters.hits);
            return Ok(Self::hit(entry));
        }

        Counters::bump(&self.counters.misses);
        Counters::bump(&self.counters.computations);
        let value = compute().await?;

        let created_at = match self.put(key, value.clone()).await {
            Ok(entry) => entry.created_at,
            Err(e) => {
                self.degraded("put", key, &e);
                self.clock.now()
            }
        };
        Ok(Cached {
            value,
            status: CacheStatus::Miss,
            created_at,
        })
    }

    /// Counter snapshot
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CacheStats {
            hits: load(&self.counters.hits),
            misses: load(&self.counters.misses),
            computations: load(&self.counters.computations),
            expired: load(&self.counters.expired),
            degraded: load(&self.counters.degraded),
            hot_entries: self.hot.entry_count(),
        }
    }

    /// Keys with a computation currently running or queued
    #[inline]
    #[must_use]
    pub fn inflight_len(&self) -> usize {
        self.inflight.len()
    }

    fn hit(entry: CacheEntry<T>) -> Cached<T> {
        Cached {
            value: entry.payload,
            status: CacheStatus::Hit,
            created_at: entry.created_at,
        }
    }

    async fn lookup(&self, key: &CacheKey) -> Option<CacheEntry<T>> {
        let now = self.clock.now();

        if let Some(entry) = self.hot.get(key).await {
            if self.is_fresh(entry.created_at, now) {
                return Some(CacheEntry::clone(&entry));
            }
            self.expire(key, entry.created_at.timestamp_millis()).await;
            return None;
        }

        let k = *key;
        let stored = match self.blocking(move |backend| backend.load(&k)).await {
            Ok(stored) => stored?,
            Err(e) => {
                self.degraded("get", key, &e);
                return None;
            }
        };

        let Some(created_at) = DateTime::<Utc>::from_timestamp_millis(stored.created_at_ms) else {
            self.expire(key, stored.created_at_ms).await;
            return None;
        };
        if !self.is_fresh(created_at, now) {
            self.expire(key, stored.created_at_ms).await;
            return None;
        }

        let payload: T = match serde_json::from_str(&stored.payload) {
            Ok(payload) => payload,
            Err(e) => {
                self.degraded("decode", key, &e.into());
                return None;
            }
        };
        let entry = CacheEntry {
            key: *key,
            payload,
            created_at,
        };
        self.hot.insert(*key, Arc::new(entry.clone())).await;
        Some(entry)
    }

    /// Drop the entry observed with `created_at_ms`
    ///
    /// Both layers only delete that exact version; an entry written by a
    /// concurrent computation after the stale read is kept.
    async fn expire(&self, key: &CacheKey, created_at_ms: i64) {
        let _ = self
            .hot
            .entry(*key)
            .and_compute_with(|current| {
                let observed = current
                    .is_some_and(|e| e.value().created_at.timestamp_millis() == created_at_ms);
                std::future::ready(if observed { Op::Remove } else { Op::Nop })
            })
            .await;

        let k = *key;
        match self
            .blocking(move |backend| backend.remove(&k, created_at_ms))
            .await
        {
            Ok(true) => {
                Counters::bump(&self.counters.expired);
                tracing::debug!(key = %key.short(), "expired cache entry removed");
            }
            Ok(false) => tracing::debug!(key = %key.short(), "expired cache entry already replaced"),
            Err(e) => self.degraded("expire", key, &e),
        }
    }

    fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    fn is_fresh(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(created_at).num_milliseconds() <= self.ttl_millis()
    }

    fn degraded(&self, operation: &'static str, key: &CacheKey, error: &CacheError) {
        Counters::bump(&self.counters.degraded);
        tracing::warn!(operation, key = %key.short(), error = %error, "cache degraded, continuing without it");
    }

    async fn blocking<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&dyn CacheBackend) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || op(backend.as_ref()))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::clock::ManualClock;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::AtomicUsize;

    fn key(tag: &str) -> CacheKey {
        CacheKey::compute("/reports", [tag.as_bytes()])
    }

    fn store_with_clock() -> (CacheStore<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::default());
        let store = CacheStore::new(Arc::new(MemoryBackend::new()), &CacheConfig::default())
            .with_clock(clock.clone());
        (store, clock)
    }

    /// Backend whose writes fail a set number of times
    #[derive(Debug)]
    struct FlakyWrites {
        inner: MemoryBackend,
        failures_left: AtomicUsize,
    }

    impl CacheBackend for FlakyWrites {
        fn load(&self, key: &CacheKey) -> Result<Option<StoredEntry>> {
            self.inner.load(key)
        }
        fn store(&self, key: &CacheKey, entry: &StoredEntry) -> Result<()> {
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(CacheError::Unavailable("disk full".into()));
            }
            self.inner.store(key, entry)
        }
        fn remove(&self, key: &CacheKey, created_at_ms: i64) -> Result<bool> {
            self.inner.remove(key, created_at_ms)
        }
        fn purge_older_than(&self, cutoff_ms: i64) -> Result<usize> {
            self.inner.purge_older_than(cutoff_ms)
        }
        fn len(&self) -> Result<usize> {
            self.inner.len()
        }
    }

    /// Backend whose first load stalls after reading its row
    #[derive(Debug)]
    struct StallingFirstLoad {
        inner: MemoryBackend,
        stalled: std::sync::atomic::AtomicBool,
    }

    impl CacheBackend for StallingFirstLoad {
        fn load(&self, key: &CacheKey) -> Result<Option<StoredEntry>> {
            let row = self.inner.load(key)?;
            if !self.stalled.swap(true, Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(300));
            }
            Ok(row)
        }
        fn store(&self, key: &CacheKey, entry: &StoredEntry) -> Result<()> {
            self.inner.store(key, entry)
        }
        fn remove(&self, key: &CacheKey, created_at_ms: i64) -> Result<bool> {
            self.inner.remove(key, created_at_ms)
        }
        fn purge_older_than(&self, cutoff_ms: i64) -> Result<usize> {
            self.inner.purge_older_than(cutoff_ms)
        }
        fn len(&self) -> Result<usize> {
            self.inner.len()
        }
    }

    #[tokio::test]
    async fn put_then_get() {
        let (store, _) = store_with_clock();
        store.put(&key("a"), "payload".to_string()).await.unwrap();
        let entry = store.get(&key("a")).await.unwrap();
        assert_eq!(entry.payload, "payload");
        assert_eq!(store.get(&key("b")).await, None);
        let stats = store.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[tokio::test]
    async fn expired_entry_is_not_served_and_is_removed() {
        let backend = Arc::new(MemoryBackend::new());
        let clock = Arc::new(ManualClock::default());
        let store: CacheStore<String> = CacheStore::new(backend.clone(), &CacheConfig::default())
            .with_clock(clock.clone());

        store.put(&key("a"), "old".into()).await.unwrap();
        clock.advance(DEFAULT_TTL);
        assert!(store.get(&key("a")).await.is_some(), "exactly TTL old is still fresh");

        clock.advance(Duration::from_secs(1));
        assert_eq!(store.get(&key("a")).await, None);
        assert_eq!(backend.len().unwrap(), 0);
        assert_eq!(store.stats().expired, 1);
    }

    #[tokio::test]
    async fn durable_rows_expire_for_a_cold_store() {
        let backend = Arc::new(MemoryBackend::new());
        let clock = Arc::new(ManualClock::default());
        let writer: CacheStore<String> = CacheStore::new(backend.clone(), &CacheConfig::default())
            .with_clock(clock.clone());
        writer.put(&key("a"), "v".into()).await.unwrap();

        // A second store starts with an empty hot layer and reads the backend.
        let reader: CacheStore<String> = CacheStore::new(backend.clone(), &CacheConfig::default())
            .with_clock(clock.clone());
        assert_eq!(reader.get(&key("a")).await.unwrap().payload, "v");

        let cold: CacheStore<String> = CacheStore::new(backend.clone(), &CacheConfig::default())
            .with_clock(clock.clone());
        clock.advance(DEFAULT_TTL + Duration::from_secs(1));
        assert_eq!(cold.get(&key("a")).await, None);
        assert_eq!(backend.len().unwrap(), 0);
    }

    #[tokio::test]
    async fn last_write_wins() {
        let (store, clock) = store_with_clock();
        store.put(&key("a"), "first".into()).await.unwrap();
        clock.advance(Duration::from_secs(5));
        store.put(&key("a"), "second".into()).await.unwrap();
        let entry = store.get(&key("a")).await.unwrap();
        assert_eq!(entry.payload, "second");
        assert_eq!(entry.created_at, clock.now());
    }

    #[tokio::test]
    async fn purge_removes_only_expired() {
        let backend = Arc::new(MemoryBackend::new());
        let clock = Arc::new(ManualClock::default());
        let store: CacheStore<String> = CacheStore::new(backend.clone(), &CacheConfig::default())
            .with_clock(clock.clone());

        store.put(&key("old"), "old".into()).await.unwrap();
        clock.advance(DEFAULT_TTL);
        store.put(&key("new"), "new".into()).await.unwrap();
        clock.advance(Duration::from_secs(1));

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(backend.len().unwrap(), 1);
        assert_eq!(store.get(&key("old")).await, None);
        assert!(store.get(&key("new")).await.is_some());
    }

    #[tokio::test]
    async fn second_call_is_a_hit() {
        let (store, _) = store_with_clock();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let compute = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::convert::Infallible>("value".to_string())
        };

        let first = store.get_or_compute(&key("a"), compute).await.unwrap();
        let second = store.get_or_compute(&key("a"), compute).await.unwrap();
        assert_eq!(first.status, CacheStatus::Miss);
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.value, "value");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.inflight_len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_compute_once() {
        let store: Arc<CacheStore<String>> = Arc::new(store_with_clock().0);
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    store
                        .get_or_compute(&key("shared"), move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok::<_, std::convert::Infallible>("computed".to_string())
                        })
                        .await
                        .unwrap()
                })
            })
            .collect();

        let results = futures::future::join_all(tasks).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let misses = results
            .iter()
            .map(|r| r.as_ref().unwrap())
            .filter(|c| c.status == CacheStatus::Miss)
            .count();
        assert_eq!(misses, 1);
        assert!(results.iter().all(|r| r.as_ref().unwrap().value == "computed"));
        assert_eq!(store.inflight_len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn late_stale_read_keeps_the_fresh_entry() {
        let clock = Arc::new(ManualClock::default());
        let backend = Arc::new(StallingFirstLoad {
            inner: MemoryBackend::new(),
            stalled: std::sync::atomic::AtomicBool::new(false),
        });
        let stale_at = clock.now() - chrono::TimeDelta::days(4);
        backend
            .store(
                &key("a"),
                &StoredEntry {
                    payload: "\"old\"".into(),
                    created_at_ms: stale_at.timestamp_millis(),
                },
            )
            .unwrap();
        let store: Arc<CacheStore<String>> = Arc::new(
            CacheStore::new(backend.clone(), &CacheConfig::default()).with_clock(clock.clone()),
        );

        let run = |store: Arc<CacheStore<String>>| async move {
            store
                .get_or_compute(&key("a"), || async {
                    Ok::<_, std::convert::Infallible>("new".to_string())
                })
                .await
                .unwrap()
        };
        let slow = tokio::spawn(run(Arc::clone(&store)));
        tokio::time::sleep(Duration::from_millis(30)).await;
        let fast = tokio::spawn(run(Arc::clone(&store)));

        let fast = fast.await.unwrap();
        let slow = slow.await.unwrap();
        assert_eq!(fast.status, CacheStatus::Miss);
        assert_eq!(slow.status, CacheStatus::Hit);
        assert_eq!(slow.value, "new");
        assert_eq!(store.stats().computations, 1);
        assert_eq!(backend.len().unwrap(), 1);
        assert_eq!(store.get(&key("a")).await.unwrap().payload, "new");
    }

    #[tokio::test]
    async fn failed_computation_is_not_cached() {
        let (store, _) = store_with_clock();
        let result = store
            .get_or_compute(&key("a"), || async { Err::<String, _>("boom") })
            .await;
        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(store.get(&key("a")).await, None);
        assert_eq!(store.inflight_len(), 0);
    }

    #[tokio::test]
    async fn write_failure_still_returns_value_and_retries_next_time() {
        let backend = Arc::new(FlakyWrites {
            inner: MemoryBackend::new(),
            failures_left: AtomicUsize::new(1),
        });
        let store: CacheStore<String> = CacheStore::new(backend, &CacheConfig::default());
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let compute = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, std::convert::Infallible>("v".to_string())
        };

        let first = store.get_or_compute(&key("a"), compute).await.unwrap();
        assert_eq!(first.value, "v");
        assert_eq!(store.stats().degraded, 1);

        let second = store.get_or_compute(&key("a"), compute).await.unwrap();
        assert_eq!(second.status, CacheStatus::Miss);
        let third = store.get_or_compute(&key("a"), compute).await.unwrap();
        assert_eq!(third.status, CacheStatus::Hit);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn config_defaults_to_three_days() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(259_200));
        let config = config.with_ttl(Duration::from_secs(60)).with_hot_capacity(4);
        assert_eq!(config.ttl_secs, 60);
        assert_eq!(config.hot_capacity, 4);
    }
}
