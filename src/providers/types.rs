//! Normalized result shapes handed to the renderer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw observation value the economic-series provider uses for "no data".
pub const MISSING_VALUE: &str = ".";

/// Parse a provider value string, dropping the missing sentinel and anything
/// that is not a finite number.
pub fn parse_value(raw: &str) -> Option<f64> {
  let raw = raw.trim();
  if raw == MISSING_VALUE {
    return None;
  }
  raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// One dated value of a series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
  pub date: String,
  pub value: f64,
}

/// Latest value of a point indicator and its move from the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
  pub value: f64,
  pub change: f64,
  pub pct: f64,
  pub date: String,
}

impl Observation {
  /// Build from points ordered oldest first.
  ///
  /// Uses the last two points; a single point has no change. Returns `None`
  /// when there are no points.
  pub fn from_chronological(points: &[SeriesPoint]) -> Option<Self> {
    match points {
      [] => None,
      [only] => Some(Self {
        value: only.value,
        change: 0.0,
        pct: 0.0,
        date: only.date.clone(),
      }),
      [.., previous, latest] => {
        let change = latest.value - previous.value;
        let pct = if previous.value != 0.0 {
          change / previous.value * 100.0
        } else {
          0.0
        };
        Some(Self {
          value: latest.value,
          change,
          pct,
          date: latest.date.clone(),
        })
      }
    }
  }
}

/// Market snapshot of one crypto asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinQuote {
  pub id: String,
  pub symbol: String,
  pub name: String,
  pub price: Option<f64>,
  pub change_24h: Option<f64>,
  pub market_cap: Option<f64>,
  pub image: Option<String>,
  pub sparkline: Vec<f64>,
}

/// Detailed market data for one crypto asset (USD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinDetail {
  pub id: String,
  pub name: String,
  pub symbol: String,
  pub price: Option<f64>,
  pub change_24h: Option<f64>,
  pub change_7d: Option<f64>,
  pub change_30d: Option<f64>,
  pub market_cap: Option<f64>,
  pub volume_24h: Option<f64>,
  pub high_24h: Option<f64>,
  pub low_24h: Option<f64>,
  pub ath: Option<f64>,
  pub ath_date: Option<String>,
  pub sparkline: Vec<f64>,
  pub description: String,
}

/// Exchange rates against a base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FxRates {
  pub base: String,
  pub date: String,
  pub rates: BTreeMap<String, f64>,
}

/// One reading of the 0-100 market sentiment index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentReading {
  pub value: u8,
  pub label: String,
  /// Milliseconds since the Unix epoch
  pub timestamp: i64,
}

/// Headline from a news feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
  pub title: String,
  pub link: String,
  pub pub_date: String,
  pub source: String,
  pub tag: String,
}
