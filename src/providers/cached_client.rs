//! Cached provider client: the adapter entry points used by the renderer.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::{debug, info};

use crate::cache::{CacheLayer, KvStore, PersistentCache};
use crate::config::TtlConfig;

use super::cache::ProviderKey;
use super::client::ProviderClient;
use super::types::{
  CoinDetail, CoinQuote, FxRates, NewsItem, Observation, SentimentReading, SeriesPoint,
};

/// Provider client with transparent caching support.
///
/// Each call checks the cache for a fresh value, otherwise fetches,
/// normalizes and writes through. When the fetch fails the last cached value
/// is returned regardless of age; `None` means no data has ever been seen.
pub struct DataService<S: KvStore> {
  client: ProviderClient,
  cache: CacheLayer<S>,
  ttl: TtlConfig,
}

impl<S: KvStore> DataService<S> {
  pub fn new(client: ProviderClient, cache: PersistentCache<S>, ttl: TtlConfig) -> Self {
    Self {
      client,
      cache: CacheLayer::new(cache),
      ttl,
    }
  }

  pub fn cache(&self) -> &PersistentCache<S> {
    self.cache.cache()
  }

  /// When the value currently cached for `key` was fetched.
  pub fn cached_at(&self, key: &ProviderKey) -> Option<DateTime<Utc>> {
    self.cache().timestamp(&key.cache_key())
  }

  async fn load<T, F, Fut>(&self, key: ProviderKey, fetcher: F) -> Option<T>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Option<T>>,
  {
    let cache_key = key.cache_key();
    match self.cache.fetch(&cache_key, key.ttl(&self.ttl), fetcher).await {
      Some(result) => {
        debug!(key = %cache_key, source = ?result.source, "loaded");
        Some(result.data)
      }
      None => {
        info!(resource = %key.description(), "no data available");
        None
      }
    }
  }

  pub async fn fred_latest(&self, series_id: &str) -> Option<Observation> {
    let key = ProviderKey::Fred {
      series_id: series_id.to_string(),
    };
    self.load(key, || self.client.fred_latest(series_id)).await
  }

  pub async fn fred_series(&self, series_id: &str, days: u32) -> Option<Vec<SeriesPoint>> {
    let key = ProviderKey::FredSeries {
      series_id: series_id.to_string(),
      days,
    };
    self
      .load(key, || self.client.fred_series(series_id, days))
      .await
  }

  pub async fn ecos_latest(&self, stat_code: &str, item_code: &str) -> Option<Observation> {
    let key = ProviderKey::Ecos {
      stat_code: stat_code.to_string(),
      item_code: item_code.to_string(),
    };
    self
      .load(key, || self.client.ecos_latest(stat_code, item_code))
      .await
  }

  pub async fn crypto_markets(&self) -> Option<Vec<CoinQuote>> {
    self
      .load(ProviderKey::CryptoTop, || self.client.crypto_markets())
      .await
  }

  pub async fn crypto_detail(&self, coin_id: &str) -> Option<CoinDetail> {
    let key = ProviderKey::CryptoDetail {
      coin_id: coin_id.to_string(),
    };
    self
      .load(key, || self.client.crypto_detail(coin_id))
      .await
  }

  pub async fn forex_rates(&self) -> Option<FxRates> {
    self
      .load(ProviderKey::Forex, || self.client.forex_rates())
      .await
  }

  pub async fn fear_greed(&self) -> Option<Vec<SentimentReading>> {
    self
      .load(ProviderKey::FearGreed, || self.client.fear_greed())
      .await
  }

  pub async fn news(&self, feed_url: &str, tag: &str) -> Option<Vec<NewsItem>> {
    let key = ProviderKey::News {
      tag: tag.to_string(),
      feed_url: feed_url.to_string(),
    };
    self
      .load(key, || self.client.news(feed_url, tag))
      .await
  }
}

impl<S: KvStore> Clone for DataService<S> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      cache: self.cache.clone(),
      ttl: self.ttl.clone(),
    }
  }
}
