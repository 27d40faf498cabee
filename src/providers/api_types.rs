//! Serde-deserializable types matching upstream provider responses.
//!
//! These types are separate from the normalized types so that a payload which
//! does not have the expected shape fails to parse, which the fetcher treats
//! as a failed attempt.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::types::{
  parse_value, CoinDetail, CoinQuote, FxRates, NewsItem, SentimentReading, SeriesPoint,
};

/// Longest description kept from a coin detail payload.
const DESCRIPTION_CHARS: usize = 300;

/// Most items kept from one feed.
pub const FEED_ITEM_LIMIT: usize = 10;

// ============================================================================
// Economic series provider (FRED)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiFredObservation {
  pub date: String,
  pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiFredResponse {
  pub observations: Vec<ApiFredObservation>,
}

impl ApiFredResponse {
  /// Usable observations in response order.
  pub fn points(&self) -> Vec<SeriesPoint> {
    self
      .observations
      .iter()
      .filter_map(|o| {
        parse_value(&o.value).map(|value| SeriesPoint {
          date: o.date.clone(),
          value,
        })
      })
      .collect()
  }
}

// ============================================================================
// Monthly statistics provider (ECOS)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiEcosRow {
  #[serde(rename = "TIME")]
  pub time: String,
  #[serde(rename = "DATA_VALUE")]
  pub data_value: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiEcosSearch {
  pub row: Vec<ApiEcosRow>,
}

#[derive(Debug, Deserialize)]
pub struct ApiEcosResponse {
  #[serde(rename = "StatisticSearch")]
  pub statistic_search: ApiEcosSearch,
}

impl ApiEcosResponse {
  /// Usable rows, oldest first.
  pub fn points(&self) -> Vec<SeriesPoint> {
    self
      .statistic_search
      .row
      .iter()
      .filter_map(|r| {
        parse_value(&r.data_value).map(|value| SeriesPoint {
          date: r.time.clone(),
          value,
        })
      })
      .collect()
  }
}

// ============================================================================
// Market data provider (CoinGecko)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ApiSparkline {
  #[serde(default)]
  pub price: Vec<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCoinMarket {
  pub id: String,
  pub symbol: String,
  pub name: String,
  pub current_price: Option<f64>,
  pub price_change_percentage_24h: Option<f64>,
  pub market_cap: Option<f64>,
  pub image: Option<String>,
  pub sparkline_in_7d: Option<ApiSparkline>,
}

impl ApiCoinMarket {
  pub fn into_quote(self) -> CoinQuote {
    CoinQuote {
      id: self.id,
      symbol: self.symbol.to_uppercase(),
      name: self.name,
      price: self.current_price,
      change_24h: self.price_change_percentage_24h,
      market_cap: self.market_cap,
      image: self.image,
      sparkline: self.sparkline_in_7d.unwrap_or_default().price,
    }
  }
}

/// A `{ "usd": ... }` entry from a per-currency map.
#[derive(Debug, Default, Deserialize)]
pub struct ApiUsd<T> {
  pub usd: Option<T>,
}

fn usd<T>(value: Option<ApiUsd<T>>) -> Option<T> {
  value.and_then(|v| v.usd)
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiMarketData {
  pub current_price: Option<ApiUsd<f64>>,
  pub price_change_percentage_24h: Option<f64>,
  pub price_change_percentage_7d: Option<f64>,
  pub price_change_percentage_30d: Option<f64>,
  pub market_cap: Option<ApiUsd<f64>>,
  pub total_volume: Option<ApiUsd<f64>>,
  pub high_24h: Option<ApiUsd<f64>>,
  pub low_24h: Option<ApiUsd<f64>>,
  pub ath: Option<ApiUsd<f64>>,
  pub ath_date: Option<ApiUsd<String>>,
  pub sparkline_7d: Option<ApiSparkline>,
}

#[derive(Debug, Deserialize)]
pub struct ApiDescription {
  pub en: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCoinDetail {
  pub id: String,
  pub name: String,
  pub symbol: Option<String>,
  pub market_data: Option<ApiMarketData>,
  pub description: Option<ApiDescription>,
}

impl ApiCoinDetail {
  pub fn into_detail(self) -> CoinDetail {
    let market = self.market_data.unwrap_or_default();
    let description = self
      .description
      .and_then(|d| d.en)
      .map(|en| en.chars().take(DESCRIPTION_CHARS).collect())
      .unwrap_or_default();

    CoinDetail {
      id: self.id,
      name: self.name,
      symbol: self.symbol.unwrap_or_default().to_uppercase(),
      price: usd(market.current_price),
      change_24h: market.price_change_percentage_24h,
      change_7d: market.price_change_percentage_7d,
      change_30d: market.price_change_percentage_30d,
      market_cap: usd(market.market_cap),
      volume_24h: usd(market.total_volume),
      high_24h: usd(market.high_24h),
      low_24h: usd(market.low_24h),
      ath: usd(market.ath),
      ath_date: usd(market.ath_date),
      sparkline: market.sparkline_7d.unwrap_or_default().price,
      description,
    }
  }
}

// ============================================================================
// FX-rate provider (Frankfurter)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiFxResponse {
  pub base: String,
  pub date: String,
  pub rates: BTreeMap<String, f64>,
}

impl From<ApiFxResponse> for FxRates {
  fn from(api: ApiFxResponse) -> Self {
    FxRates {
      base: api.base,
      date: api.date,
      rates: api.rates,
    }
  }
}

// ============================================================================
// Sentiment index provider (alternative.me Fear & Greed)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiSentimentEntry {
  pub value: String,
  pub value_classification: String,
  pub timestamp: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiSentimentResponse {
  pub data: Vec<ApiSentimentEntry>,
}

impl ApiSentimentResponse {
  /// Readings in response order; entries with unparsable or out-of-range
  /// numbers are dropped.
  pub fn readings(self) -> Vec<SentimentReading> {
    self
      .data
      .into_iter()
      .filter_map(|d| {
        let value = d.value.trim().parse::<u8>().ok().filter(|v| *v <= 100)?;
        let seconds = d.timestamp.trim().parse::<i64>().ok()?;
        Some(SentimentReading {
          value,
          label: d.value_classification,
          timestamp: seconds.checked_mul(1000)?,
        })
      })
      .collect()
  }
}

// ============================================================================
// Feed aggregation provider (rss2json)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiFeedInfo {
  pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiFeedItem {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub link: String,
  #[serde(rename = "pubDate", default)]
  pub pub_date: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiFeedResponse {
  pub feed: Option<ApiFeedInfo>,
  pub items: Vec<ApiFeedItem>,
}

impl ApiFeedResponse {
  /// First [`FEED_ITEM_LIMIT`] items, attributed to the feed title or `tag`.
  pub fn into_items(self, tag: &str) -> Vec<NewsItem> {
    let source = self
      .feed
      .and_then(|f| f.title)
      .filter(|t| !t.is_empty())
      .unwrap_or_else(|| tag.to_string());

    self
      .items
      .into_iter()
      .take(FEED_ITEM_LIMIT)
      .map(|item| NewsItem {
        title: item.title,
        link: item.link,
        pub_date: item.pub_date,
        source: source.clone(),
        tag: tag.to_string(),
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_fred_points_skip_missing() {
    let api: ApiFredResponse = serde_json::from_str(
      r#"{"observations":[
        {"date":"2024-05-03","value":"."},
        {"date":"2024-05-02","value":"4.50"},
        {"date":"2024-05-01","value":"4.40"}
      ]}"#,
    )
    .unwrap();
    let points = api.points();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].date, "2024-05-02");
  }

  #[test]
  fn test_fred_error_payload_does_not_parse() {
    let parsed = serde_json::from_str::<ApiFredResponse>(
      r#"{"error_code":400,"error_message":"Bad Request. The value for variable api_key is not registered."}"#,
    );
    assert!(parsed.is_err());
  }

  #[test]
  fn test_ecos_points() {
    let api: ApiEcosResponse = serde_json::from_str(
      r#"{"StatisticSearch":{"list_total_count":2,"row":[
        {"STAT_CODE":"722Y001","TIME":"202404","DATA_VALUE":"3.5"},
        {"STAT_CODE":"722Y001","TIME":"202405","DATA_VALUE":"3.25"}
      ]}}"#,
    )
    .unwrap();
    let points = api.points();
    assert_eq!(points[1].date, "202405");
    assert_eq!(points[1].value, 3.25);
  }

  #[test]
  fn test_coin_market_into_quote() {
    let api: ApiCoinMarket = serde_json::from_str(
      r#"{"id":"bitcoin","symbol":"btc","name":"Bitcoin","current_price":65000.5,
          "price_change_percentage_24h":-1.2,"market_cap":1.2e12,"image":"https://img/btc.png",
          "sparkline_in_7d":{"price":[1.0,2.0]}}"#,
    )
    .unwrap();
    let quote = api.into_quote();
    assert_eq!(quote.symbol, "BTC");
    assert_eq!(quote.sparkline, vec![1.0, 2.0]);
    assert_eq!(quote.change_24h, Some(-1.2));
  }

  #[test]
  fn test_coin_detail_truncates_description() {
    let long = "x".repeat(500);
    let json = serde_json::json!({
      "id": "ethereum",
      "name": "Ethereum",
      "symbol": "eth",
      "market_data": {
        "current_price": {"usd": 3000.0, "eur": 2800.0},
        "price_change_percentage_7d": 4.5,
        "ath_date": {"usd": "2021-11-10T14:24:19.604Z"}
      },
      "description": {"en": long}
    });
    let detail = serde_json::from_value::<ApiCoinDetail>(json).unwrap().into_detail();
    assert_eq!(detail.symbol, "ETH");
    assert_eq!(detail.price, Some(3000.0));
    assert_eq!(detail.change_7d, Some(4.5));
    assert_eq!(detail.market_cap, None);
    assert_eq!(detail.ath_date.as_deref(), Some("2021-11-10T14:24:19.604Z"));
    assert_eq!(detail.description.len(), 300);
    assert!(detail.sparkline.is_empty());
  }

  #[test]
  fn test_sentiment_readings_convert_timestamp() {
    let api: ApiSentimentResponse = serde_json::from_str(
      r#"{"name":"Fear and Greed Index","data":[
        {"value":"72","value_classification":"Greed","timestamp":"1717200000"},
        {"value":"oops","value_classification":"?","timestamp":"1717113600"}
      ]}"#,
    )
    .unwrap();
    let readings = api.readings();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].value, 72);
    assert_eq!(readings[0].label, "Greed");
    assert_eq!(readings[0].timestamp, 1_717_200_000_000);
  }

  #[test]
  fn test_sentiment_overflowing_timestamp_is_dropped() {
    let api: ApiSentimentResponse = serde_json::from_str(
      r#"{"data":[
        {"value":"50","value_classification":"Neutral","timestamp":"9300000000000000"},
        {"value":"40","value_classification":"Fear","timestamp":"1717113600"}
      ]}"#,
    )
    .unwrap();
    let readings = api.readings();
    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].label, "Fear");
  }

  #[test]
  fn test_feed_caps_items_and_falls_back_to_tag() {
    let items: Vec<_> = (0..15)
      .map(|i| serde_json::json!({"title": format!("t{}", i), "link": "l", "pubDate": "d"}))
      .collect();
    let api: ApiFeedResponse =
      serde_json::from_value(serde_json::json!({"status": "ok", "items": items})).unwrap();

    let news = api.into_items("global");
    assert_eq!(news.len(), FEED_ITEM_LIMIT);
    assert_eq!(news[0].title, "t0");
    assert_eq!(news[9].source, "global");
    assert_eq!(news[9].tag, "global");
  }
}
