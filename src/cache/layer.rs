//! Cache layer that orchestrates stale-while-revalidate logic with network fetching.

use chrono::{DateTime, Duration, Utc};
use color_eyre::Result;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::storage::CacheStorage;
use super::traits::{CacheEntry, CacheKey, CacheResult, Freshness};

/// Completion of a background refresh started by a stale hit.
///
/// Resolves to `true` when the refreshed value was persisted. Dropping the
/// handle does not cancel the refresh.
#[derive(Clone)]
pub struct RefreshHandle {
  inner: Shared<BoxFuture<'static, bool>>,
}

impl RefreshHandle {
  /// Wait for the refresh to finish.
  pub async fn finished(self) -> bool {
    self.inner.await
  }
}

impl fmt::Debug for RefreshHandle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("RefreshHandle").finish_non_exhaustive()
  }
}

struct InFlight {
  id: u64,
  handle: RefreshHandle,
}

type InFlightMap = Arc<Mutex<HashMap<String, InFlight>>>;

/// Cache layer that serves persisted values immediately and refreshes stale
/// ones in the background.
///
/// - fresh entry (`age <= ttl`): returned, no fetch
/// - stale entry: returned, fetch spawned, entry overwritten on success
/// - missing entry: fetch awaited, persisted on success, error propagated
pub struct StaleWhileRevalidateCache<S: CacheStorage> {
  storage: Arc<S>,
  clock: Arc<dyn Clock>,
  /// How long before cached data is considered stale
  ttl: Duration,
  /// Entries older than this are not served at all
  max_age: Option<Duration>,
  coalesce_refreshes: bool,
  in_flight: InFlightMap,
  next_refresh_id: Arc<AtomicU64>,
}

impl<S: CacheStorage + 'static> StaleWhileRevalidateCache<S> {
  /// Create a new cache layer with the given storage backend.
  pub fn new(storage: S) -> Self {
    Self {
      storage: Arc::new(storage),
      clock: Arc::new(SystemClock),
      ttl: Duration::minutes(5),
      max_age: None,
      coalesce_refreshes: false,
      in_flight: Arc::new(Mutex::new(HashMap::new())),
      next_refresh_id: Arc::new(AtomicU64::new(0)),
    }
  }

  /// Set the staleness window.
  pub fn with_ttl(mut self, ttl: Duration) -> Self {
    self.ttl = ttl;
    self
  }

  #[cfg(test)]
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  /// Let concurrent stale hits for one key share a single refresh.
  pub fn with_refresh_coalescing(mut self, enabled: bool) -> Self {
    self.coalesce_refreshes = enabled;
    self
  }

  /// Hard cap on entry age; older entries are handled as a miss.
  pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
    self.max_age = max_age;
    self
  }

  pub fn ttl(&self) -> Duration {
    self.ttl
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  /// Classify an entry stored at `stored_at` against the current time.
  pub fn freshness(&self, stored_at: DateTime<Utc>) -> Freshness {
    self.freshness_within(stored_at, self.ttl)
  }

  fn freshness_within(&self, stored_at: DateTime<Utc>, ttl: Duration) -> Freshness {
    let age = self.clock.now() - stored_at;
    if self.max_age.is_some_and(|max_age| age > max_age) {
      Freshness::Expired
    } else if age <= ttl {
      Freshness::Fresh
    } else {
      Freshness::Stale
    }
  }

  /// Read the persisted entry for `key` without fetching.
  #[cfg(test)]
  pub fn peek<K, T>(&self, key: &K) -> Result<Option<CacheEntry<T>>>
  where
    K: CacheKey + ?Sized,
    T: DeserializeOwned,
  {
    self.storage.read(&key.cache_hash())
  }

  /// Fetch a value with the stale-while-revalidate strategy.
  ///
  /// `fetcher` is only invoked when the entry is stale, expired or missing.
  /// Its error is returned only on a miss; a failed background refresh is
  /// logged and leaves the stored entry untouched.
  pub async fn get<K, T, F, Fut>(&self, key: &K, fetcher: F) -> Result<CacheResult<T>>
  where
    K: CacheKey + ?Sized,
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    self.get_with_ttl(key, self.ttl, fetcher).await
  }

  /// Like [`get`](Self::get) with a staleness window for this call only.
  pub async fn get_with_ttl<K, T, F, Fut>(
    &self,
    key: &K,
    ttl: Duration,
    fetcher: F,
  ) -> Result<CacheResult<T>>
  where
    K: CacheKey + ?Sized,
    T: Serialize + DeserializeOwned + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let hash = key.cache_hash();

    if let Some(entry) = self.read_entry::<T>(&hash) {
      match self.freshness_within(entry.stored_at, ttl) {
        Freshness::Fresh => {
          debug!(key = %key.description(), "Cache hit (fresh)");
          return Ok(CacheResult::fresh(entry.value, entry.stored_at));
        }
        Freshness::Stale => {
          debug!(key = %key.description(), stored_at = %entry.stored_at, "Cache hit (stale), refreshing");
          let refresh = self.refresh_in_background(hash, fetcher);
          return Ok(CacheResult::stale(entry.value, entry.stored_at, refresh));
        }
        Freshness::Expired => {
          debug!(key = %key.description(), stored_at = %entry.stored_at, "Cached entry past max age");
        }
      }
    }

    // No usable cache, must fetch from network
    debug!(key = %key.description(), "Cache miss, fetching");
    let data = fetcher().await?;
    persist(self.storage.as_ref(), self.clock.as_ref(), &hash, &data);
    Ok(CacheResult::from_network(data))
  }

  /// Read failures and undecodable entries count as a miss.
  fn read_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
    match self.storage.read(key) {
      Ok(entry) => entry,
      Err(e) => {
        warn!(key, error = %e, "Unreadable cache entry, treating as miss");
        None
      }
    }
  }

  fn refresh_in_background<T, F, Fut>(&self, key: String, fetcher: F) -> RefreshHandle
  where
    T: Serialize + Send + 'static,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    if !self.coalesce_refreshes {
      return self.spawn_refresh(key, None, fetcher());
    }

    // Held across spawn + insert so the task cannot unregister before it is registered
    let mut in_flight = lock_in_flight(&self.in_flight);
    if let Some(existing) = in_flight.get(&key) {
      debug!(key, "Joining in-flight refresh");
      return existing.handle.clone();
    }

    let id = self.next_refresh_id.fetch_add(1, Ordering::Relaxed);
    let handle = self.spawn_refresh(key.clone(), Some(id), fetcher());
    in_flight.insert(
      key,
      InFlight {
        id,
        handle: handle.clone(),
      },
    );
    handle
  }

  fn spawn_refresh<T, Fut>(&self, key: String, in_flight_id: Option<u64>, fut: Fut) -> RefreshHandle
  where
    T: Serialize + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let storage = Arc::clone(&self.storage);
    let clock = Arc::clone(&self.clock);
    let in_flight = Arc::clone(&self.in_flight);

    let task = tokio::spawn(async move {
      let updated = match fut.await {
        Ok(data) => persist(storage.as_ref(), clock.as_ref(), &key, &data),
        Err(e) => {
          warn!(key, error = %e, "Background refresh failed, keeping stale entry");
          false
        }
      };

      if let Some(id) = in_flight_id {
        let mut in_flight = lock_in_flight(&in_flight);
        if in_flight.get(&key).is_some_and(|f| f.id == id) {
          in_flight.remove(&key);
        }
      }

      updated
    });

    RefreshHandle {
      inner: async move { task.await.unwrap_or(false) }.boxed().shared(),
    }
  }
}

/// Best-effort write; failures are logged and reported as `false`.
fn persist<S, T>(storage: &S, clock: &dyn Clock, key: &str, data: &T) -> bool
where
  S: CacheStorage,
  T: Serialize,
{
  match storage.write(key, &CacheEntry::new(data, clock.now())) {
    Ok(()) => {
      debug!(key, "Cache entry stored");
      true
    }
    Err(e) => {
      warn!(key, error = %e, "Failed to persist cache entry");
      false
    }
  }
}

fn lock_in_flight(map: &InFlightMap) -> MutexGuard<'_, HashMap<String, InFlight>> {
  // The map only holds handles; a poisoned guard is still consistent
  map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S: CacheStorage> Clone for StaleWhileRevalidateCache<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      clock: Arc::clone(&self.clock),
      ttl: self.ttl,
      max_age: self.max_age,
      coalesce_refreshes: self.coalesce_refreshes,
      in_flight: Arc::clone(&self.in_flight),
      next_refresh_id: Arc::clone(&self.next_refresh_id),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::clock::manual::ManualClock;
  use crate::cache::storage::{MemoryStorage, StoredEntryInfo};
  use crate::cache::traits::CacheSource;
  use color_eyre::eyre::eyre;
  use serde::Deserialize;
  use std::sync::atomic::AtomicUsize;
  use tokio::sync::oneshot;

  #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
  struct Indicators {
    gdp: u64,
  }

  const KEY: &str = "indicators";

  fn setup() -> (StaleWhileRevalidateCache<MemoryStorage>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let cache = StaleWhileRevalidateCache::new(MemoryStorage::new())
      .with_ttl(Duration::hours(6))
      .with_clock(clock.clone());
    (cache, clock)
  }

  fn seed(cache: &StaleWhileRevalidateCache<MemoryStorage>, gdp: u64, stored_at: DateTime<Utc>) {
    cache
      .storage()
      .write(KEY, &CacheEntry::new(Indicators { gdp }, stored_at))
      .unwrap();
  }

  fn fetch_ok(
    calls: &Arc<AtomicUsize>,
    gdp: u64,
  ) -> impl FnOnce() -> BoxFuture<'static, Result<Indicators>> {
    let calls = Arc::clone(calls);
    move || {
      calls.fetch_add(1, Ordering::SeqCst);
      async move { Ok::<_, color_eyre::Report>(Indicators { gdp }) }.boxed()
    }
  }

  fn fetch_err(
    calls: &Arc<AtomicUsize>,
    msg: &'static str,
  ) -> impl FnOnce() -> BoxFuture<'static, Result<Indicators>> {
    let calls = Arc::clone(calls);
    move || {
      calls.fetch_add(1, Ordering::SeqCst);
      async move { Err::<Indicators, _>(eyre!(msg)) }.boxed()
    }
  }

  /// Fetch that completes only when the returned sender is used.
  fn fetch_slow(
    calls: &Arc<AtomicUsize>,
  ) -> (
    oneshot::Sender<Result<Indicators>>,
    impl FnOnce() -> BoxFuture<'static, Result<Indicators>>,
  ) {
    let (tx, rx) = oneshot::channel();
    let calls = Arc::clone(calls);
    let fetcher = move || {
      calls.fetch_add(1, Ordering::SeqCst);
      async move {
        match rx.await {
          Ok(result) => result,
          Err(_) => Err(eyre!("fetch abandoned")),
        }
      }
      .boxed()
    };
    (tx, fetcher)
  }

  #[tokio::test]
  async fn test_fresh_entry_skips_fetch() {
    let (cache, clock) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    seed(&cache, 27000, clock.now());

    let result = cache.get(KEY, fetch_ok(&calls, 1)).await.unwrap();

    assert_eq!(result.data, Indicators { gdp: 27000 });
    assert_eq!(result.source, CacheSource::CacheFresh);
    assert!(result.refresh.is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_stale_entry_returned_before_slow_fetch_completes() {
    let (cache, clock) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let stored_at = clock.now() - Duration::hours(6) - Duration::seconds(1);
    seed(&cache, 27000, stored_at);

    let (tx, fetcher) = fetch_slow(&calls);
    let result = cache.get(KEY, fetcher).await.unwrap();

    assert_eq!(result.data, Indicators { gdp: 27000 });
    assert_eq!(result.source, CacheSource::CacheStale);
    assert_eq!(result.cached_at, Some(stored_at));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Refresh has not completed, the store still holds the stale value
    let entry: CacheEntry<Indicators> = cache.peek(KEY).unwrap().unwrap();
    assert_eq!(entry.value.gdp, 27000);

    drop(tx);
    assert!(!result.refresh.unwrap().finished().await);
  }

  #[tokio::test]
  async fn test_stale_hit_refreshes_in_background() {
    let (cache, clock) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    seed(&cache, 27000, clock.now() - Duration::hours(7));

    let (tx, fetcher) = fetch_slow(&calls);
    let result = cache.get(KEY, fetcher).await.unwrap();
    tx.send(Ok(Indicators { gdp: 27500 })).unwrap();
    assert!(result.refresh.unwrap().finished().await);

    let next = cache.get(KEY, fetch_ok(&calls, 1)).await.unwrap();
    assert_eq!(next.data, Indicators { gdp: 27500 });
    assert_eq!(next.source, CacheSource::CacheFresh);
    assert_eq!(next.cached_at, Some(clock.now()));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_miss_fetches_and_persists() {
    let (cache, clock) = setup();
    let calls = Arc::new(AtomicUsize::new(0));

    let result = cache.get(KEY, fetch_ok(&calls, 27000)).await.unwrap();
    assert_eq!(result.data, Indicators { gdp: 27000 });
    assert_eq!(result.source, CacheSource::Network);

    clock.advance(Duration::hours(1));
    let again = cache.get(KEY, fetch_ok(&calls, 1)).await.unwrap();
    assert_eq!(again.data, Indicators { gdp: 27000 });
    assert_eq!(again.source, CacheSource::CacheFresh);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_miss_failure_propagates_without_write() {
    let (cache, _clock) = setup();
    let calls = Arc::new(AtomicUsize::new(0));

    let err = cache
      .get(KEY, fetch_err(&calls, "capital markets returned 503"))
      .await
      .unwrap_err();

    assert_eq!(err.to_string(), "capital markets returned 503");
    let entry: Option<CacheEntry<Indicators>> = cache.peek(KEY).unwrap();
    assert!(entry.is_none());
    assert!(cache.storage().list().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_failed_refresh_keeps_stale_entry() {
    let (cache, clock) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let stored_at = clock.now() - Duration::hours(8);
    seed(&cache, 26000, stored_at);

    let result = cache.get(KEY, fetch_err(&calls, "timeout")).await.unwrap();
    assert!(!result.refresh.unwrap().finished().await);

    let again = cache.get(KEY, fetch_err(&calls, "timeout")).await.unwrap();
    assert_eq!(again.data, Indicators { gdp: 26000 });
    assert_eq!(again.source, CacheSource::CacheStale);
    assert_eq!(again.cached_at, Some(stored_at));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_exact_ttl_boundary_is_fresh() {
    let (cache, clock) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let stored_at = clock.now() - Duration::hours(6);
    seed(&cache, 27000, stored_at);

    assert_eq!(cache.freshness(stored_at), Freshness::Fresh);
    let result = cache.get(KEY, fetch_ok(&calls, 1)).await.unwrap();
    assert_eq!(result.source, CacheSource::CacheFresh);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    clock.advance(Duration::nanoseconds(1));
    assert_eq!(cache.freshness(stored_at), Freshness::Stale);
  }

  #[tokio::test]
  async fn test_per_call_ttl_overrides_instance_ttl() {
    let (cache, clock) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    seed(&cache, 1, clock.now() - Duration::hours(2));

    let result = cache
      .get_with_ttl(KEY, Duration::hours(1), fetch_ok(&calls, 2))
      .await
      .unwrap();
    assert_eq!(result.source, CacheSource::CacheStale);
    assert!(result.refresh.unwrap().finished().await);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_six_hour_indicator_timeline() {
    let (cache, clock) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    let t0 = clock.now();

    // t=0: empty store
    let result = cache.get(KEY, fetch_ok(&calls, 27000)).await.unwrap();
    assert_eq!(result.data.gdp, 27000);
    assert_eq!(cache.peek::<_, Indicators>(KEY).unwrap().unwrap().stored_at, t0);

    // t=3h: fresh, no network
    clock.advance(Duration::hours(3));
    let result = cache.get(KEY, fetch_ok(&calls, 1)).await.unwrap();
    assert_eq!(result.data.gdp, 27000);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // t=7h: stale value served, refresh completes at 7h+2s
    clock.advance(Duration::hours(4));
    let (tx, fetcher) = fetch_slow(&calls);
    let result = cache.get(KEY, fetcher).await.unwrap();
    assert_eq!(result.data.gdp, 27000);
    clock.advance(Duration::seconds(2));
    tx.send(Ok(Indicators { gdp: 27500 })).unwrap();
    assert!(result.refresh.unwrap().finished().await);

    let entry: CacheEntry<Indicators> = cache.peek(KEY).unwrap().unwrap();
    assert_eq!(
      entry,
      CacheEntry::new(
        Indicators { gdp: 27500 },
        t0 + Duration::hours(7) + Duration::seconds(2)
      )
    );

    // t=7h+5s
    clock.advance(Duration::seconds(3));
    let result = cache.get(KEY, fetch_ok(&calls, 1)).await.unwrap();
    assert_eq!(result.data.gdp, 27500);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_concurrent_stale_hits_each_refresh() {
    let (cache, clock) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    seed(&cache, 1, clock.now() - Duration::days(1));

    let first = cache.get(KEY, fetch_ok(&calls, 2)).await.unwrap();
    let second = cache.get(KEY, fetch_ok(&calls, 3)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    assert!(first.refresh.unwrap().finished().await);
    assert!(second.refresh.unwrap().finished().await);
  }

  #[tokio::test]
  async fn test_coalesced_stale_hits_share_refresh() {
    let (cache, clock) = setup();
    let cache = cache.with_refresh_coalescing(true);
    let calls = Arc::new(AtomicUsize::new(0));
    seed(&cache, 1, clock.now() - Duration::days(1));

    let (tx, fetcher) = fetch_slow(&calls);
    let first = cache.get(KEY, fetcher).await.unwrap();
    let second = cache.get(KEY, fetch_ok(&calls, 99)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    tx.send(Ok(Indicators { gdp: 2 })).unwrap();
    assert!(first.refresh.unwrap().finished().await);
    assert!(second.refresh.unwrap().finished().await);
    assert_eq!(cache.peek::<_, Indicators>(KEY).unwrap().unwrap().value.gdp, 2);

    // Finished refreshes are unregistered
    clock.advance(Duration::days(1));
    let third = cache.get(KEY, fetch_ok(&calls, 3)).await.unwrap();
    assert!(third.refresh.unwrap().finished().await);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_dropped_refresh_handle_still_completes() {
    let (cache, clock) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    seed(&cache, 1, clock.now() - Duration::days(1));

    let result = cache.get(KEY, fetch_ok(&calls, 2)).await.unwrap();
    drop(result);

    tokio::time::timeout(std::time::Duration::from_secs(5), async {
      loop {
        let entry: CacheEntry<Indicators> = cache.peek(KEY).unwrap().unwrap();
        if entry.value.gdp == 2 {
          break;
        }
        tokio::task::yield_now().await;
      }
    })
    .await
    .unwrap();
  }

  #[tokio::test]
  async fn test_expired_entry_handled_as_miss() {
    let (cache, clock) = setup();
    let cache = cache.with_max_age(Some(Duration::hours(24)));
    let calls = Arc::new(AtomicUsize::new(0));
    let stored_at = clock.now() - Duration::hours(25);
    seed(&cache, 1, stored_at);

    assert_eq!(cache.freshness(stored_at), Freshness::Expired);
    let result = cache.get(KEY, fetch_ok(&calls, 2)).await.unwrap();
    assert_eq!(result.data.gdp, 2);
    assert_eq!(result.source, CacheSource::Network);

    // Without a successful fetch an expired entry is not served
    clock.advance(Duration::hours(25));
    assert!(cache.get(KEY, fetch_err(&calls, "down")).await.is_err());
  }

  #[tokio::test]
  async fn test_undecodable_entry_treated_as_miss() {
    let (cache, clock) = setup();
    let calls = Arc::new(AtomicUsize::new(0));
    cache
      .storage()
      .write(KEY, &CacheEntry::new("not indicators", clock.now()))
      .unwrap();

    let result = cache.get(KEY, fetch_ok(&calls, 5)).await.unwrap();
    assert_eq!(result.source, CacheSource::Network);
    assert_eq!(cache.peek::<_, Indicators>(KEY).unwrap().unwrap().value.gdp, 5);
  }

  /// Storage that serves an optional fixed entry and rejects every write.
  #[derive(Default)]
  struct ReadOnlyStorage {
    entry: Option<(serde_json::Value, DateTime<Utc>)>,
  }

  impl ReadOnlyStorage {
    fn holding(value: Indicators, stored_at: DateTime<Utc>) -> Self {
      Self {
        entry: Some((serde_json::to_value(value).unwrap(), stored_at)),
      }
    }
  }

  impl CacheStorage for ReadOnlyStorage {
    fn read<T: DeserializeOwned>(&self, _key: &str) -> Result<Option<CacheEntry<T>>> {
      match &self.entry {
        Some((value, stored_at)) => Ok(Some(CacheEntry::new(
          serde_json::from_value(value.clone())?,
          *stored_at,
        ))),
        None => Ok(None),
      }
    }

    fn write<T: Serialize>(&self, _key: &str, _entry: &CacheEntry<T>) -> Result<()> {
      Err(eyre!("quota exceeded"))
    }

    fn remove(&self, _key: &str) -> Result<bool> {
      Ok(false)
    }

    fn clear(&self) -> Result<usize> {
      Ok(0)
    }

    fn list(&self) -> Result<Vec<StoredEntryInfo>> {
      Ok(Vec::new())
    }
  }

  #[tokio::test]
  async fn test_write_failure_still_returns_value() {
    let cache = StaleWhileRevalidateCache::new(ReadOnlyStorage::default());
    let calls = Arc::new(AtomicUsize::new(0));

    let result = cache.get(KEY, fetch_ok(&calls, 27000)).await.unwrap();
    assert_eq!(result.data.gdp, 27000);
    assert_eq!(result.source, CacheSource::Network);
  }

  #[tokio::test]
  async fn test_refresh_write_failure_keeps_serving_stale() {
    let clock = Arc::new(ManualClock::new());
    let stored_at = clock.now() - Duration::hours(7);
    let cache = StaleWhileRevalidateCache::new(ReadOnlyStorage::holding(
      Indicators { gdp: 27000 },
      stored_at,
    ))
    .with_ttl(Duration::hours(6))
    .with_clock(clock.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let result = cache.get(KEY, fetch_ok(&calls, 27500)).await.unwrap();
    assert_eq!(result.data.gdp, 27000);
    assert_eq!(result.source, CacheSource::CacheStale);
    assert!(!result.refresh.unwrap().finished().await);

    let again = cache.get(KEY, fetch_ok(&calls, 27500)).await.unwrap();
    assert_eq!(again.data.gdp, 27000);
    assert_eq!(again.source, CacheSource::CacheStale);
    assert_eq!(again.cached_at, Some(stored_at));
    assert!(!again.refresh.unwrap().finished().await);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
