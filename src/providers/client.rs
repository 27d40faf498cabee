//! Upstream provider client: URL construction, fetching and normalization.
//!
//! Every method returns `None` when no strategy produced a payload of the
//! expected shape, or when the payload held nothing usable.

use chrono::{Months, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::config::{Config, Endpoints};
use crate::fetch::{Fetcher, Transport};

use super::api_types::{
  ApiCoinDetail, ApiCoinMarket, ApiEcosResponse, ApiFeedResponse, ApiFredResponse, ApiFxResponse,
  ApiSentimentResponse,
};
use super::types::{
  CoinDetail, CoinQuote, FxRates, NewsItem, Observation, SentimentReading, SeriesPoint,
};

/// How far back the latest-value series request looks.
const FRED_LOOKBACK_DAYS: u64 = 400;

/// Months of monthly statistics requested.
const ECOS_LOOKBACK_MONTHS: u32 = 13;

/// Key the monthly statistics provider accepts without registration.
const ECOS_SAMPLE_KEY: &str = "sample";

pub const FX_BASE: &str = "USD";
pub const FX_SYMBOLS: &[&str] = &["EUR", "GBP", "JPY", "KRW", "CNY", "CHF"];

/// Readings requested from the sentiment index.
const SENTIMENT_LIMIT: u32 = 30;

fn build_url(base: &str, params: &[(&str, &str)]) -> Option<Url> {
  Url::parse_with_params(base, params)
    .map_err(|e| warn!(base, error = %e, "invalid provider URL"))
    .ok()
}

/// Client for every upstream provider.
#[derive(Clone)]
pub struct ProviderClient {
  /// Providers that need the proxy chain
  proxied: Fetcher,
  market: Fetcher,
  fx: Fetcher,
  sentiment: Fetcher,
  feed: Fetcher,
  endpoints: Endpoints,
  fred_key: Option<String>,
  ecos_key: Option<String>,
}

impl ProviderClient {
  pub fn new(transport: Arc<dyn Transport>, config: &Config) -> Self {
    let fred_key = Config::fred_api_key();
    if fred_key.is_none() {
      warn!("no FRED API key set (FINBOARD_FRED_KEY); series requests will fail");
    }

    Self {
      proxied: Fetcher::new(transport.clone(), config.fetch.proxy_chain.clone()),
      market: Fetcher::direct(transport.clone(), config.fetch.market_timeout()),
      fx: Fetcher::direct(transport.clone(), config.fetch.fx_timeout()),
      sentiment: Fetcher::direct(transport.clone(), config.fetch.sentiment_timeout()),
      feed: Fetcher::direct(transport, config.fetch.feed_timeout()),
      endpoints: config.endpoints.clone(),
      fred_key,
      ecos_key: Config::ecos_api_key(),
    }
  }

  /// Override the provider API keys.
  pub fn with_keys(mut self, fred_key: Option<String>, ecos_key: Option<String>) -> Self {
    self.fred_key = fred_key;
    self.ecos_key = ecos_key;
    self
  }

  fn fred_url(&self, params: &[(&str, &str)]) -> Option<Url> {
    let base = format!(
      "{}/series/observations",
      self.endpoints.fred.trim_end_matches('/')
    );
    let mut all = params.to_vec();
    if let Some(key) = &self.fred_key {
      all.push(("api_key", key.as_str()));
    }
    all.push(("file_type", "json"));
    build_url(&base, &all)
  }

  pub fn fred_latest_url(&self, series_id: &str, today: NaiveDate) -> Option<Url> {
    let start = (today - chrono::Days::new(FRED_LOOKBACK_DAYS))
      .format("%Y-%m-%d")
      .to_string();
    self.fred_url(&[
      ("series_id", series_id),
      ("sort_order", "desc"),
      ("limit", "2"),
      ("observation_start", start.as_str()),
    ])
  }

  pub fn fred_series_url(&self, series_id: &str, days: u32, today: NaiveDate) -> Option<Url> {
    let start = (today - chrono::Days::new(days.into()))
      .format("%Y-%m-%d")
      .to_string();
    let end = today.format("%Y-%m-%d").to_string();
    self.fred_url(&[
      ("series_id", series_id),
      ("sort_order", "asc"),
      ("observation_start", start.as_str()),
      ("observation_end", end.as_str()),
    ])
  }

  pub fn ecos_url(&self, stat_code: &str, item_code: &str, today: NaiveDate) -> Option<Url> {
    let start = today
      .checked_sub_months(Months::new(ECOS_LOOKBACK_MONTHS))
      .unwrap_or(today);
    let key = self.ecos_key.as_deref().unwrap_or(ECOS_SAMPLE_KEY);
    let rows = ECOS_LOOKBACK_MONTHS + 1;
    let url = format!(
      "{}/StatisticSearch/{}/json/kr/1/{}/{}/M/{}/{}/{}",
      self.endpoints.ecos.trim_end_matches('/'),
      key,
      rows,
      stat_code,
      start.format("%Y%m"),
      today.format("%Y%m"),
      item_code
    );
    Url::parse(&url)
      .map_err(|e| warn!(error = %e, "invalid monthly statistics URL"))
      .ok()
  }

  /// Latest value of an economic series and its change from the prior one.
  pub async fn fred_latest(&self, series_id: &str) -> Option<Observation> {
    let url = self.fred_latest_url(series_id, Utc::now().date_naive())?;
    let response: ApiFredResponse = self.proxied.fetch(url.as_str()).await?;

    // Newest first on the wire
    let mut points = response.points();
    points.truncate(2);
    points.reverse();

    let observation = Observation::from_chronological(&points);
    if observation.is_none() {
      debug!(series_id, "no usable observations");
    }
    observation
  }

  /// Observations of an economic series over the last `days`, oldest first.
  pub async fn fred_series(&self, series_id: &str, days: u32) -> Option<Vec<SeriesPoint>> {
    let url = self.fred_series_url(series_id, days, Utc::now().date_naive())?;
    let response: ApiFredResponse = self.proxied.fetch(url.as_str()).await?;

    let points = response.points();
    if points.is_empty() {
      debug!(series_id, "no usable observations");
      return None;
    }
    Some(points)
  }

  /// Latest monthly statistic and its change from the prior month.
  pub async fn ecos_latest(&self, stat_code: &str, item_code: &str) -> Option<Observation> {
    let url = self.ecos_url(stat_code, item_code, Utc::now().date_naive())?;
    let response: ApiEcosResponse = self.proxied.fetch(url.as_str()).await?;
    Observation::from_chronological(&response.points())
  }

  /// Top assets by market cap.
  pub async fn crypto_markets(&self) -> Option<Vec<CoinQuote>> {
    let base = format!(
      "{}/coins/markets",
      self.endpoints.coingecko.trim_end_matches('/')
    );
    let url = build_url(
      &base,
      &[
        ("vs_currency", "usd"),
        ("order", "market_cap_desc"),
        ("per_page", "10"),
        ("page", "1"),
        ("sparkline", "true"),
        ("price_change_percentage", "24h"),
      ],
    )?;

    let markets: Vec<ApiCoinMarket> = self.market.fetch(url.as_str()).await?;
    Some(markets.into_iter().map(ApiCoinMarket::into_quote).collect())
  }

  pub async fn crypto_detail(&self, coin_id: &str) -> Option<CoinDetail> {
    let mut url = Url::parse(self.endpoints.coingecko.trim_end_matches('/'))
      .map_err(|e| warn!(error = %e, "invalid market data endpoint"))
      .ok()?;
    url
      .path_segments_mut()
      .map_err(|_| warn!("market data endpoint cannot have a path"))
      .ok()?
      .pop_if_empty()
      .extend(["coins", coin_id]);
    url
      .query_pairs_mut()
      .append_pair("localization", "false")
      .append_pair("tickers", "false")
      .append_pair("community_data", "false")
      .append_pair("developer_data", "false")
      .append_pair("sparkline", "true");

    let detail: ApiCoinDetail = self.market.fetch(url.as_str()).await?;
    Some(detail.into_detail())
  }

  pub async fn forex_rates(&self) -> Option<FxRates> {
    let base = format!("{}/latest", self.endpoints.frankfurter.trim_end_matches('/'));
    let symbols = FX_SYMBOLS.join(",");
    let url = build_url(&base, &[("base", FX_BASE), ("symbols", symbols.as_str())])?;

    let response: ApiFxResponse = self.fx.fetch(url.as_str()).await?;
    Some(response.into())
  }

  /// Recent sentiment index readings, newest first.
  pub async fn fear_greed(&self) -> Option<Vec<SentimentReading>> {
    let base = format!("{}/fng/", self.endpoints.fear_greed.trim_end_matches('/'));
    let limit = SENTIMENT_LIMIT.to_string();
    let url = build_url(&base, &[("limit", limit.as_str()), ("format", "json")])?;

    let response: ApiSentimentResponse = self.sentiment.fetch(url.as_str()).await?;
    Some(response.readings())
  }

  /// First items of an RSS feed, via the feed-to-JSON service.
  pub async fn news(&self, feed_url: &str, tag: &str) -> Option<Vec<NewsItem>> {
    let base = format!(
      "{}/v1/api.json",
      self.endpoints.rss2json.trim_end_matches('/')
    );
    let url = build_url(&base, &[("rss_url", feed_url)])?;

    let response: ApiFeedResponse = self.feed.fetch(url.as_str()).await?;
    Some(response.into_items(tag))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fetch::ReqwestTransport;

  fn client(endpoints: Endpoints) -> ProviderClient {
    let config = Config {
      endpoints,
      ..Config::default()
    };
    ProviderClient::new(Arc::new(ReqwestTransport::new().unwrap()), &config)
      .with_keys(Some("fred-key".into()), Some("ecos-key".into()))
  }

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
  }

  #[test]
  fn test_fred_latest_url() {
    let url = client(Endpoints::default())
      .fred_latest_url("DGS10", today())
      .unwrap();
    assert_eq!(
      url.as_str(),
      "https://api.stlouisfed.org/fred/series/observations?series_id=DGS10&sort_order=desc&limit=2\
       &observation_start=2023-02-09&api_key=fred-key&file_type=json"
    );
  }

  #[test]
  fn test_fred_series_url() {
    let url = client(Endpoints::default())
      .fred_series_url("UNRATE", 30, today())
      .unwrap();
    let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    assert!(query.contains(&("sort_order".into(), "asc".into())));
    assert!(query.contains(&("observation_start".into(), "2024-02-14".into())));
    assert!(query.contains(&("observation_end".into(), "2024-03-15".into())));
  }

  #[test]
  fn test_ecos_url_covers_thirteen_months() {
    let url = client(Endpoints::default())
      .ecos_url("722Y001", "0101000", today())
      .unwrap();
    assert_eq!(
      url.as_str(),
      "https://ecos.bok.or.kr/api/StatisticSearch/ecos-key/json/kr/1/14/722Y001/M/202302/202403/0101000"
    );
  }

  #[tokio::test]
  async fn test_direct_providers_against_mock_server() {
    let mut server = mockito::Server::new_async().await;
    let endpoints = Endpoints {
      fred: server.url(),
      ecos: server.url(),
      coingecko: server.url(),
      frankfurter: server.url(),
      fear_greed: server.url(),
      rss2json: server.url(),
    };

    server
      .mock("GET", "/latest")
      .match_query(mockito::Matcher::AllOf(vec![
        mockito::Matcher::UrlEncoded("base".into(), "USD".into()),
        mockito::Matcher::UrlEncoded("symbols".into(), "EUR,GBP,JPY,KRW,CNY,CHF".into()),
      ]))
      .with_body(r#"{"amount":1.0,"base":"USD","date":"2024-03-15","rates":{"EUR":0.92,"KRW":1330.5}}"#)
      .create_async()
      .await;
    server
      .mock("GET", "/coins/bitcoin")
      .match_query(mockito::Matcher::Any)
      .with_body(r#"{"id":"bitcoin","name":"Bitcoin","symbol":"btc","market_data":{"current_price":{"usd":70000.0}}}"#)
      .create_async()
      .await;
    server
      .mock("GET", "/v1/api.json")
      .match_query(mockito::Matcher::UrlEncoded(
        "rss_url".into(),
        "https://feeds.test/rss.xml".into(),
      ))
      .with_body(r#"{"status":"ok","feed":{"title":"Test Feed"},"items":[{"title":"Rates rise","link":"https://n/1","pubDate":"2024-03-15 09:00:00"}]}"#)
      .create_async()
      .await;

    let client = client(endpoints);

    let fx = client.forex_rates().await.unwrap();
    assert_eq!(fx.base, "USD");
    assert_eq!(fx.rates.get("KRW"), Some(&1330.5));

    let coin = client.crypto_detail("bitcoin").await.unwrap();
    assert_eq!(coin.symbol, "BTC");
    assert_eq!(coin.price, Some(70000.0));

    let news = client.news("https://feeds.test/rss.xml", "global").await.unwrap();
    assert_eq!(news.len(), 1);
    assert_eq!(news[0].source, "Test Feed");
  }

  #[tokio::test]
  async fn test_shape_failure_is_none() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("GET", "/fng/")
      .match_query(mockito::Matcher::Any)
      .with_body(r#"{"metadata":{"error":"rate limited"}}"#)
      .create_async()
      .await;

    let client = client(Endpoints {
      fear_greed: server.url(),
      ..Endpoints::default()
    });
    assert!(client.fear_greed().await.is_none());
  }
}
