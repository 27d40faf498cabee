//! Cache keys and lifetimes for provider data.

use std::time::Duration;
use url::Url;

use crate::config::TtlConfig;

/// Logical resources served by the provider adapters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderKey {
  /// Latest value of an economic series
  Fred { series_id: String },
  /// Economic series over a window of days
  FredSeries { series_id: String, days: u32 },
  /// Latest monthly statistic
  Ecos { stat_code: String, item_code: String },
  /// Top crypto assets by market cap
  CryptoTop,
  /// One crypto asset in detail
  CryptoDetail { coin_id: String },
  /// USD exchange rates
  Forex,
  /// Sentiment index readings
  FearGreed,
  /// Headlines of one feed under a tag
  News { tag: String, feed_url: String },
}

/// Host and path of a feed URL, so feeds sharing a tag get distinct keys.
/// Anything that does not parse as a URL is used verbatim.
fn feed_discriminator(feed_url: &str) -> String {
  match Url::parse(feed_url) {
    Ok(url) => format!(
      "{}{}",
      url.host_str().unwrap_or_default(),
      url.path().trim_end_matches('/')
    ),
    Err(_) => feed_url.to_string(),
  }
}

impl ProviderKey {
  /// Key under the cache namespace. Readable so that lexicographic eviction
  /// groups entries by provider.
  pub fn cache_key(&self) -> String {
    match self {
      Self::Fred { series_id } => format!("fred_{}", series_id),
      Self::FredSeries { series_id, days } => format!("fred_series_{}_{}", series_id, days),
      Self::Ecos {
        stat_code,
        item_code,
      } => format!("ecos_{}_{}", stat_code, item_code),
      Self::CryptoTop => "crypto_top".to_string(),
      Self::CryptoDetail { coin_id } => format!("crypto_detail_{}", coin_id),
      Self::Forex => "forex_rates".to_string(),
      Self::FearGreed => "fear_greed".to_string(),
      Self::News { tag, feed_url } => format!("news_{}_{}", tag, feed_discriminator(feed_url)),
    }
  }

  /// Cache lifetime for this resource's adapter class.
  pub fn ttl(&self, ttl: &TtlConfig) -> Duration {
    let secs = match self {
      Self::Fred { .. } | Self::FredSeries { .. } => ttl.fred,
      Self::Ecos { .. } => ttl.ecos,
      Self::CryptoTop | Self::CryptoDetail { .. } => ttl.crypto,
      Self::Forex => ttl.forex,
      Self::FearGreed => ttl.fear_greed,
      Self::News { .. } => ttl.news,
    };
    Duration::from_secs(secs)
  }

  pub fn description(&self) -> String {
    match self {
      Self::Fred { series_id } => format!("series {}", series_id),
      Self::FredSeries { series_id, days } => format!("series {} over {} days", series_id, days),
      Self::Ecos {
        stat_code,
        item_code,
      } => format!("statistic {}/{}", stat_code, item_code),
      Self::CryptoTop => "top crypto assets".to_string(),
      Self::CryptoDetail { coin_id } => format!("crypto asset {}", coin_id),
      Self::Forex => "exchange rates".to_string(),
      Self::FearGreed => "fear & greed index".to_string(),
      Self::News { tag, feed_url } => format!("{} news from {}", tag, feed_url),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cache_keys() {
    let fred = ProviderKey::Fred {
      series_id: "DGS10".into(),
    };
    assert_eq!(fred.cache_key(), "fred_DGS10");
    assert_eq!(
      ProviderKey::FredSeries {
        series_id: "DGS10".into(),
        days: 365
      }
      .cache_key(),
      "fred_series_DGS10_365"
    );
    assert_eq!(
      ProviderKey::Ecos {
        stat_code: "722Y001".into(),
        item_code: "0101000".into()
      }
      .cache_key(),
      "ecos_722Y001_0101000"
    );
    assert_eq!(
      ProviderKey::News {
        tag: "korea".into(),
        feed_url: "https://www.mk.co.kr/rss/30100041/".into()
      }
      .cache_key(),
      "news_korea_www.mk.co.kr/rss/30100041"
    );
  }

  #[test]
  fn test_feeds_sharing_a_tag_get_distinct_keys() {
    let bbc = ProviderKey::News {
      tag: "global".into(),
      feed_url: "https://feeds.bbci.co.uk/news/business/rss.xml".into(),
    };
    let nyt = ProviderKey::News {
      tag: "global".into(),
      feed_url: "https://rss.nytimes.com/services/xml/rss/nyt/Business.xml".into(),
    };
    assert_ne!(bbc.cache_key(), nyt.cache_key());
    assert!(bbc.cache_key().starts_with("news_global_"));
    assert_eq!(
      nyt.cache_key(),
      "news_global_rss.nytimes.com/services/xml/rss/nyt/Business.xml"
    );
  }

  #[test]
  fn test_ttl_classes() {
    let ttl = TtlConfig::default();
    assert_eq!(
      ProviderKey::Fred {
        series_id: "X".into()
      }
      .ttl(&ttl),
      Duration::from_secs(3600)
    );
    assert_eq!(ProviderKey::CryptoTop.ttl(&ttl), Duration::from_secs(120));
    assert_eq!(ProviderKey::FearGreed.ttl(&ttl), Duration::from_secs(900));
    assert_eq!(
      ProviderKey::News {
        tag: "x".into(),
        feed_url: "https://x.test/rss".into()
      }
      .ttl(&ttl),
      Duration::from_secs(900)
    );
  }
}
