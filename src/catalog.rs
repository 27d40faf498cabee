//! Dashboard indicator definitions and the page-load helper that fetches them.

use serde::Serialize;

use crate::batch::run_batched;
use crate::cache::KvStore;
use crate::providers::{DataService, NewsItem, Observation};

/// Where an indicator's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum IndicatorSource {
  Fred,
  Ecos {
    stat_code: &'static str,
    item_code: &'static str,
  },
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Indicator {
  pub id: &'static str,
  pub label: &'static str,
  pub unit: &'static str,
  #[serde(flatten)]
  pub source: IndicatorSource,
}

const fn fred(id: &'static str, label: &'static str, unit: &'static str) -> Indicator {
  Indicator {
    id,
    label,
    unit,
    source: IndicatorSource::Fred,
  }
}

pub const INDICATORS_US: &[Indicator] = &[
  fred("FEDFUNDS", "Fed Funds Rate", "%"),
  fred("DGS10", "US 10Y Treasury", "%"),
  fred("DGS2", "US 2Y Treasury", "%"),
  fred("UNRATE", "US Unemployment", "%"),
  fred("CPIAUCSL", "US CPI", ""),
  fred("DCOILWTICO", "WTI Oil", "$"),
  fred("VIXCLS", "VIX", ""),
  fred("BAMLH0A0HYM2", "HY Spread", "%"),
];

pub const INDICATORS_KR: &[Indicator] = &[
  Indicator {
    id: "bok_rate",
    label: "BOK Rate",
    unit: "%",
    source: IndicatorSource::Ecos {
      stat_code: "722Y001",
      item_code: "0101000",
    },
  },
  Indicator {
    id: "bok_cpi",
    label: "Korea CPI",
    unit: "",
    source: IndicatorSource::Ecos {
      stat_code: "901Y009",
      item_code: "0",
    },
  },
  fred("DEXKOUS", "USD/KRW", "KRW"),
];

/// News feeds shown on the dashboard: (feed URL, tag).
pub const NEWS_FEEDS: &[(&str, &str)] = &[
  ("https://feeds.bbci.co.uk/news/business/rss.xml", "global"),
  (
    "https://rss.nytimes.com/services/xml/rss/nyt/Business.xml",
    "global",
  ),
  ("https://www.mk.co.kr/rss/30100041/", "korea"),
];

/// An indicator and whatever value could be loaded for it.
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorValue {
  #[serde(flatten)]
  pub indicator: Indicator,
  pub observation: Option<Observation>,
}

/// Load every indicator, at most `width` at a time, in catalog order.
pub async fn load_indicators<S: KvStore>(
  service: &DataService<S>,
  indicators: &[Indicator],
  width: usize,
) -> Vec<IndicatorValue> {
  let tasks: Vec<_> = indicators
    .iter()
    .map(|indicator| {
      move || async move {
        let observation = match indicator.source {
          IndicatorSource::Fred => service.fred_latest(indicator.id).await,
          IndicatorSource::Ecos {
            stat_code,
            item_code,
          } => service.ecos_latest(stat_code, item_code).await,
        };
        IndicatorValue {
          indicator: *indicator,
          observation,
        }
      }
    })
    .collect();

  run_batched(tasks, width).await
}

/// Built-in feed URLs for `tag`, in catalog order.
pub fn feeds_for(tag: &str) -> Vec<&'static str> {
  NEWS_FEEDS
    .iter()
    .filter(|(_, t)| *t == tag)
    .map(|(url, _)| *url)
    .collect()
}

/// Headlines of every feed in `feed_urls`, at most `width` feeds at a time.
/// Feeds with no data contribute nothing.
pub async fn load_news<S: KvStore>(
  service: &DataService<S>,
  feed_urls: &[&str],
  tag: &str,
  width: usize,
) -> Vec<NewsItem> {
  let tasks: Vec<_> = feed_urls
    .iter()
    .map(|feed_url| move || service.news(feed_url, tag))
    .collect();

  run_batched(tasks, width)
    .await
    .into_iter()
    .flatten()
    .flatten()
    .collect()
}
