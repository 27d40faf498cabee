use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::batch::DEFAULT_BATCH_WIDTH;
use crate::cache::DEFAULT_NAMESPACE;
use crate::fetch::{default_proxy_chain, Strategy};

/// Fixed settings of the data layer, read once at startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub ttl: TtlConfig,
  #[serde(default)]
  pub fetch: FetchConfig,
  #[serde(default)]
  pub batch: BatchConfig,
  #[serde(default)]
  pub endpoints: Endpoints,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Disable to route every read to the network
  #[serde(default = "default_true")]
  pub enabled: bool,
  #[serde(default = "default_namespace")]
  pub namespace: String,
  /// Capacity of the backing store in bytes
  #[serde(default = "default_quota_bytes")]
  pub quota_bytes: usize,
  /// Database file (defaults to $XDG_DATA_HOME/finboard/cache.db)
  pub path: Option<PathBuf>,
}

fn default_true() -> bool {
  true
}

fn default_namespace() -> String {
  DEFAULT_NAMESPACE.to_string()
}

fn default_quota_bytes() -> usize {
  5 * 1024 * 1024
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      namespace: default_namespace(),
      quota_bytes: default_quota_bytes(),
      path: None,
    }
  }
}

/// Cache lifetime per adapter class, in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
  pub fred: u64,
  pub ecos: u64,
  pub crypto: u64,
  pub forex: u64,
  pub fear_greed: u64,
  pub news: u64,
}

impl Default for TtlConfig {
  fn default() -> Self {
    Self {
      fred: 60 * 60,
      ecos: 60 * 60,
      crypto: 2 * 60,
      forex: 60 * 60,
      fear_greed: 15 * 60,
      news: 15 * 60,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
  /// Strategies tried in order for providers that need a proxy
  pub proxy_chain: Vec<Strategy>,
  pub market_timeout_ms: u64,
  pub fx_timeout_ms: u64,
  pub sentiment_timeout_ms: u64,
  pub feed_timeout_ms: u64,
}

impl Default for FetchConfig {
  fn default() -> Self {
    Self {
      proxy_chain: default_proxy_chain(),
      market_timeout_ms: 10_000,
      fx_timeout_ms: 8_000,
      sentiment_timeout_ms: 8_000,
      feed_timeout_ms: 10_000,
    }
  }
}

impl FetchConfig {
  pub fn market_timeout(&self) -> Duration {
    Duration::from_millis(self.market_timeout_ms)
  }

  pub fn fx_timeout(&self) -> Duration {
    Duration::from_millis(self.fx_timeout_ms)
  }

  pub fn sentiment_timeout(&self) -> Duration {
    Duration::from_millis(self.sentiment_timeout_ms)
  }

  pub fn feed_timeout(&self) -> Duration {
    Duration::from_millis(self.feed_timeout_ms)
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
  /// Most adapter calls in flight at once
  pub width: usize,
}

impl Default for BatchConfig {
  fn default() -> Self {
    Self {
      width: DEFAULT_BATCH_WIDTH,
    }
  }
}

/// Base URLs of the upstream providers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
  pub fred: String,
  pub ecos: String,
  pub coingecko: String,
  pub frankfurter: String,
  pub fear_greed: String,
  pub rss2json: String,
}

impl Default for Endpoints {
  fn default() -> Self {
    Self {
      fred: "https://api.stlouisfed.org/fred".to_string(),
      ecos: "https://ecos.bok.or.kr/api".to_string(),
      coingecko: "https://api.coingecko.com/api/v3".to_string(),
      frankfurter: "https://api.frankfurter.dev".to_string(),
      fear_greed: "https://api.alternative.me".to_string(),
      rss2json: "https://api.rss2json.com".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./finboard.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/finboard/config.yaml
  ///
  /// Built-in defaults are used when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("finboard.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("finboard").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.fetch.proxy_chain.is_empty() {
      return Err(eyre!("fetch.proxy_chain must list at least one strategy"));
    }
    Ok(config)
  }

  /// API key for the economic series provider.
  ///
  /// Checks FINBOARD_FRED_KEY first, then FRED_API_KEY as fallback.
  pub fn fred_api_key() -> Option<String> {
    std::env::var("FINBOARD_FRED_KEY")
      .or_else(|_| std::env::var("FRED_API_KEY"))
      .ok()
  }

  /// API key for the monthly statistics provider.
  ///
  /// Checks FINBOARD_ECOS_KEY first, then ECOS_API_KEY as fallback.
  pub fn ecos_api_key() -> Option<String> {
    std::env::var("FINBOARD_ECOS_KEY")
      .or_else(|_| std::env::var("ECOS_API_KEY"))
      .ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = Config::from_yaml("{}").unwrap();
    assert!(config.cache.enabled);
    assert_eq!(config.cache.namespace, DEFAULT_NAMESPACE);
    assert_eq!(config.ttl.crypto, 120);
    assert_eq!(config.batch.width, 3);
    assert_eq!(config.fetch.proxy_chain.len(), 3);
    assert_eq!(config.fetch.fx_timeout(), Duration::from_secs(8));
  }

  #[test]
  fn test_partial_override() {
    let config = Config::from_yaml(
      r#"
ttl:
  news: 60
batch:
  width: 5
fetch:
  proxy_chain:
    - kind: direct
      timeout_ms: 2000
endpoints:
  fred: http://localhost:9000/fred
"#,
    )
    .unwrap();
    assert_eq!(config.ttl.news, 60);
    assert_eq!(config.ttl.fred, 3600);
    assert_eq!(config.batch.width, 5);
    assert_eq!(
      config.fetch.proxy_chain,
      vec![Strategy::direct(Duration::from_secs(2))]
    );
    assert_eq!(config.fetch.market_timeout_ms, 10_000);
    assert_eq!(config.endpoints.fred, "http://localhost:9000/fred");
    assert_eq!(config.endpoints.ecos, "https://ecos.bok.or.kr/api");
  }

  #[test]
  fn test_empty_proxy_chain_rejected() {
    assert!(Config::from_yaml("fetch:\n  proxy_chain: []\n").is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_error() {
    assert!(Config::load(Some(Path::new("/nonexistent/finboard.yaml"))).is_err());
  }
}
