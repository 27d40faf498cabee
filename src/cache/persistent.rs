//! Namespaced cache with explicit expiry over a [`KvStore`].

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::storage::KvStore;
use super::traits::{CacheEntry, Clock, SystemClock};

/// Default prefix for keys written by the cache.
pub const DEFAULT_NAMESPACE: &str = "fb_cache_";

/// Cache of JSON values with fresh and stale reads.
///
/// No method fails: store errors and corrupt entries read as absent, and
/// writes that cannot be stored even after an eviction sweep are dropped.
pub struct PersistentCache<S: KvStore> {
  store: Arc<S>,
  namespace: String,
  clock: Arc<dyn Clock>,
}

impl<S: KvStore> PersistentCache<S> {
  pub fn new(store: S) -> Self {
    Self::with_namespace(store, DEFAULT_NAMESPACE)
  }

  pub fn with_namespace(store: S, namespace: impl Into<String>) -> Self {
    Self {
      store: Arc::new(store),
      namespace: namespace.into(),
      clock: Arc::new(SystemClock),
    }
  }

  /// Replace the clock used for expiry decisions.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  fn storage_key(&self, key: &str) -> String {
    format!("{}{}", self.namespace, key)
  }

  fn read_entry(&self, key: &str) -> Option<CacheEntry> {
    let storage_key = self.storage_key(key);
    let raw = match self.store.get(&storage_key) {
      Ok(raw) => raw?,
      Err(e) => {
        warn!(key = %storage_key, error = %e, "cache read failed");
        return None;
      }
    };

    match serde_json::from_str(&raw) {
      Ok(entry) => Some(entry),
      Err(e) => {
        debug!(key = %storage_key, error = %e, "ignoring corrupt cache entry");
        None
      }
    }
  }

  fn decode<T: DeserializeOwned>(key: &str, entry: CacheEntry) -> Option<T> {
    serde_json::from_value(entry.value)
      .map_err(|e| debug!(key, error = %e, "cached value has unexpected shape"))
      .ok()
  }

  /// Value under `key` if it was written and has not expired.
  pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let entry = self.read_entry(key)?;
    if !entry.is_fresh_at(self.clock.now()) {
      return None;
    }
    Self::decode(key, entry)
  }

  /// Value under `key` regardless of expiry.
  pub fn get_stale<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let entry = self.read_entry(key)?;
    Self::decode(key, entry)
  }

  /// When the value under `key` was written.
  pub fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
    self.read_entry(key).map(|entry| entry.created_at)
  }

  /// Write `value` under `key`, fresh for `ttl`.
  ///
  /// If the store rejects the write, one eviction sweep runs and the write
  /// is retried once. A second rejection drops the write.
  pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
    let value = match serde_json::to_value(value) {
      Ok(value) => value,
      Err(e) => {
        warn!(key, error = %e, "value is not serializable, not caching");
        return;
      }
    };

    let created_at = self.clock.now();
    let expires_at = chrono::Duration::from_std(ttl)
      .ok()
      .and_then(|ttl| created_at.checked_add_signed(ttl))
      .unwrap_or(DateTime::<Utc>::MAX_UTC);

    let entry = CacheEntry {
      value,
      created_at,
      expires_at,
    };
    let raw = match serde_json::to_string(&entry) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(key, error = %e, "failed to encode cache entry");
        return;
      }
    };

    let storage_key = self.storage_key(key);
    if let Err(e) = self.store.set(&storage_key, &raw) {
      debug!(key = %storage_key, error = %e, "cache write rejected, evicting");
      let evicted = self.evict_half();
      if let Err(e) = self.store.set(&storage_key, &raw) {
        warn!(key = %storage_key, evicted, error = %e, "cache write dropped after eviction");
      }
    }
  }

  /// Remove the lexicographically smallest half (rounded up) of the keys in
  /// this cache's namespace. Keys outside the namespace are left alone.
  ///
  /// Returns the number of keys removed.
  pub fn evict_half(&self) -> usize {
    let mut keys: Vec<String> = match self.store.keys() {
      Ok(keys) => keys
        .into_iter()
        .filter(|k| k.starts_with(&self.namespace))
        .collect(),
      Err(e) => {
        warn!(error = %e, "failed to list cache keys for eviction");
        return 0;
      }
    };
    keys.sort();

    let half = keys.len().div_ceil(2);
    let mut removed = 0;
    for key in &keys[..half] {
      match self.store.remove(key) {
        Ok(()) => removed += 1,
        Err(e) => debug!(key = %key, error = %e, "failed to evict cache key"),
      }
    }
    removed
  }
}

impl<S: KvStore> Clone for PersistentCache<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      namespace: self.namespace.clone(),
      clock: Arc::clone(&self.clock),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::MemoryStore;
  use crate::cache::traits::ManualClock;
  use color_eyre::{eyre::eyre, Result};
  use std::sync::atomic::{AtomicUsize, Ordering};

  fn cache_with_clock() -> (PersistentCache<MemoryStore>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let cache = PersistentCache::new(MemoryStore::new()).with_clock(clock.clone());
    (cache, clock)
  }

  #[test]
  fn test_never_written_is_absent() {
    let (cache, _) = cache_with_clock();
    assert_eq!(cache.get::<i64>("missing"), None);
    assert_eq!(cache.get_stale::<i64>("missing"), None);
    assert_eq!(cache.timestamp("missing"), None);
  }

  #[test]
  fn test_fresh_then_expired_but_stale_readable() {
    let (cache, clock) = cache_with_clock();
    cache.set("fred_DGS10", &4.25_f64, Duration::from_secs(3600));
    assert_eq!(cache.get::<f64>("fred_DGS10"), Some(4.25));

    clock.advance(chrono::Duration::seconds(3599));
    assert_eq!(cache.get::<f64>("fred_DGS10"), Some(4.25));

    // Exactly at expires_at the entry is no longer fresh
    clock.advance(chrono::Duration::seconds(1));
    assert_eq!(cache.get::<f64>("fred_DGS10"), None);
    assert_eq!(cache.get_stale::<f64>("fred_DGS10"), Some(4.25));
  }

  #[test]
  fn test_timestamp_reports_write_time() {
    let (cache, clock) = cache_with_clock();
    let written_at = clock.now();
    cache.set("forex_rates", &"x", Duration::from_secs(60));
    clock.advance(chrono::Duration::minutes(5));
    assert_eq!(cache.timestamp("forex_rates"), Some(written_at));
  }

  #[test]
  fn test_keys_are_independent() {
    let (cache, _) = cache_with_clock();
    cache.set("a", &1, Duration::from_secs(60));
    assert_eq!(cache.get::<i32>("b"), None);
  }

  #[test]
  fn test_corrupt_entry_reads_as_absent() {
    let (cache, _) = cache_with_clock();
    cache.store().set("fb_cache_bad", "not json").unwrap();
    assert_eq!(cache.get::<i32>("bad"), None);
    assert_eq!(cache.get_stale::<i32>("bad"), None);
  }

  #[test]
  fn test_evict_half_removes_smallest_namespaced_keys() {
    let (cache, _) = cache_with_clock();
    for key in ["d", "b", "e", "a", "c"] {
      cache.set(key, &key, Duration::from_secs(60));
    }
    cache.store().set("other_app_a", "1").unwrap();

    assert_eq!(cache.evict_half(), 3);

    for key in ["a", "b", "c"] {
      assert_eq!(cache.get_stale::<String>(key), None, "{} should be evicted", key);
    }
    for key in ["d", "e"] {
      assert_eq!(cache.get_stale::<String>(key).as_deref(), Some(key));
    }
    assert_eq!(
      cache.store().get("other_app_a").unwrap().as_deref(),
      Some("1")
    );
  }

  #[test]
  fn test_full_store_evicts_then_keeps_new_key() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let probe = PersistentCache::new(MemoryStore::new()).with_clock(clock.clone());
    probe.set("k0", &0, Duration::from_secs(60));
    let entry_size = probe.store().get("fb_cache_k0").unwrap().unwrap().len() + "fb_cache_k0".len();

    // Room for exactly four entries
    let cache = PersistentCache::new(MemoryStore::with_quota(entry_size * 4)).with_clock(clock);
    for i in 0..4 {
      cache.set(&format!("k{}", i), &i, Duration::from_secs(60));
    }
    cache.set("k4", &4, Duration::from_secs(60));

    assert_eq!(cache.get::<i32>("k4"), Some(4));
    assert_eq!(cache.get::<i32>("k0"), None);
    assert_eq!(cache.get::<i32>("k1"), None);
    assert_eq!(cache.get::<i32>("k2"), Some(2));
    assert_eq!(cache.get::<i32>("k3"), Some(3));
  }

  /// Store whose writes always fail.
  #[derive(Default)]
  struct RejectingStore {
    writes: AtomicUsize,
  }

  impl KvStore for RejectingStore {
    fn get(&self, _key: &str) -> Result<Option<String>> {
      Err(eyre!("unavailable"))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<()> {
      self.writes.fetch_add(1, Ordering::SeqCst);
      Err(eyre!("quota exceeded"))
    }

    fn remove(&self, _key: &str) -> Result<()> {
      Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
      Err(eyre!("unavailable"))
    }
  }

  #[test]
  fn test_failing_store_never_panics_and_retries_once() {
    let cache = PersistentCache::new(RejectingStore::default());
    cache.set("k", &1, Duration::from_secs(60));
    assert_eq!(cache.store().writes.load(Ordering::SeqCst), 2);
    assert_eq!(cache.get::<i32>("k"), None);
    assert_eq!(cache.get_stale::<i32>("k"), None);
  }
}
