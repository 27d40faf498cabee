//! Upstream provider adapters.
//!
//! - `api_types`: raw payloads as the providers send them
//! - `types`: normalized shapes returned to callers
//! - `client`: URL construction, fetching and normalization
//! - `cached_client`: the cache-first entry points

pub mod api_types;
pub mod cache;
pub mod cached_client;
pub mod client;
pub mod types;

pub use cache::ProviderKey;
pub use cached_client::DataService;
pub use client::ProviderClient;
pub use types::{
  CoinDetail, CoinQuote, FxRates, NewsItem, Observation, SentimentReading, SeriesPoint,
};
