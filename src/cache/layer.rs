//! Cache layer that orchestrates caching logic with network fetching.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use super::persistent::PersistentCache;
use super::storage::KvStore;
use super::traits::CacheResult;

/// Cache layer that manages caching logic and network fetching.
///
/// This layer sits between the provider adapters and the network, providing
/// transparent caching with offline support.
pub struct CacheLayer<S: KvStore> {
  cache: PersistentCache<S>,
}

impl<S: KvStore> CacheLayer<S> {
  /// Create a new cache layer over the given cache.
  pub fn new(cache: PersistentCache<S>) -> Self {
    Self { cache }
  }

  pub fn cache(&self) -> &PersistentCache<S> {
    &self.cache
  }

  /// Fetch with a cache-first strategy.
  ///
  /// 1. Check cache - if fresh, return immediately
  /// 2. On miss, fetch from network
  /// 3. On success, write through with `ttl`
  /// 4. On failure (`None`), return the last stale value if there is one
  ///
  /// The fetcher returns an already normalized value; `None` covers both
  /// transport and shape failures.
  pub async fn fetch<T, F, Fut>(&self, key: &str, ttl: Duration, fetcher: F) -> Option<CacheResult<T>>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<T>>,
  {
    if let Some(data) = self.cache.get::<T>(key) {
      debug!(key, "cache hit");
      return Some(CacheResult::from_cache(data, self.cache.timestamp(key)));
    }

    match fetcher().await {
      Some(data) => {
        self.cache.set(key, &data, ttl);
        Some(CacheResult::from_network(data))
      }
      None => {
        let stale = self.cache.get_stale::<T>(key)?;
        debug!(key, "fetch failed, serving stale cache");
        Some(CacheResult::offline(stale, self.cache.timestamp(key)))
      }
    }
  }
}

impl<S: KvStore> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
    }
  }
}
