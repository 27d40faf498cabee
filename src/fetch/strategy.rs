//! Network access strategies for the proxy chain.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout applied to each proxied attempt.
pub const PROXY_TIMEOUT_MS: u64 = 6_000;

pub const ALL_ORIGINS_ENDPOINT: &str = "https://api.allorigins.win";
pub const CORS_PROXY_ENDPOINT: &str = "https://corsproxy.io";

fn default_proxy_timeout_ms() -> u64 {
  PROXY_TIMEOUT_MS
}

/// One way of reaching an upstream URL, with its own per-attempt timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
  /// Request the URL as-is.
  Direct {
    #[serde(default = "default_proxy_timeout_ms")]
    timeout_ms: u64,
  },
  /// `{endpoint}/raw?url={encoded url}`
  AllOrigins {
    endpoint: String,
    #[serde(default = "default_proxy_timeout_ms")]
    timeout_ms: u64,
  },
  /// `{endpoint}/?{encoded url}`
  CorsProxy {
    endpoint: String,
    #[serde(default = "default_proxy_timeout_ms")]
    timeout_ms: u64,
  },
}

impl Strategy {
  pub fn direct(timeout: Duration) -> Self {
    Strategy::Direct {
      timeout_ms: timeout.as_millis() as u64,
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      Strategy::Direct { .. } => "direct",
      Strategy::AllOrigins { .. } => "all_origins",
      Strategy::CorsProxy { .. } => "cors_proxy",
    }
  }

  pub fn timeout(&self) -> Duration {
    let ms = match self {
      Strategy::Direct { timeout_ms }
      | Strategy::AllOrigins { timeout_ms, .. }
      | Strategy::CorsProxy { timeout_ms, .. } => *timeout_ms,
    };
    Duration::from_millis(ms)
  }

  /// The URL actually requested for `url` under this strategy.
  pub fn rewrite(&self, url: &str) -> String {
    match self {
      Strategy::Direct { .. } => url.to_string(),
      Strategy::AllOrigins { endpoint, .. } => {
        format!("{}/raw?url={}", endpoint.trim_end_matches('/'), encode(url))
      }
      Strategy::CorsProxy { endpoint, .. } => {
        format!("{}/?{}", endpoint.trim_end_matches('/'), encode(url))
      }
    }
  }
}

fn encode(url: &str) -> String {
  url::form_urlencoded::byte_serialize(url.as_bytes()).collect()
}

/// Public CORS proxies first, then the URL itself.
pub fn default_proxy_chain() -> Vec<Strategy> {
  vec![
    Strategy::AllOrigins {
      endpoint: ALL_ORIGINS_ENDPOINT.to_string(),
      timeout_ms: PROXY_TIMEOUT_MS,
    },
    Strategy::CorsProxy {
      endpoint: CORS_PROXY_ENDPOINT.to_string(),
      timeout_ms: PROXY_TIMEOUT_MS,
    },
    Strategy::Direct {
      timeout_ms: PROXY_TIMEOUT_MS,
    },
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  const TARGET: &str = "https://api.example.com/obs?series_id=DGS10&limit=2";

  #[test]
  fn test_direct_is_identity() {
    assert_eq!(Strategy::direct(Duration::from_secs(8)).rewrite(TARGET), TARGET);
  }

  #[test]
  fn test_all_origins_rewrite() {
    let strategy = Strategy::AllOrigins {
      endpoint: "https://proxy.test/".to_string(),
      timeout_ms: 6000,
    };
    assert_eq!(
      strategy.rewrite(TARGET),
      "https://proxy.test/raw?url=https%3A%2F%2Fapi.example.com%2Fobs%3Fseries_id%3DDGS10%26limit%3D2"
    );
  }

  #[test]
  fn test_cors_proxy_rewrite() {
    let strategy = Strategy::CorsProxy {
      endpoint: "https://cors.test".to_string(),
      timeout_ms: 6000,
    };
    assert_eq!(
      strategy.rewrite(TARGET),
      "https://cors.test/?https%3A%2F%2Fapi.example.com%2Fobs%3Fseries_id%3DDGS10%26limit%3D2"
    );
  }

  #[test]
  fn test_default_chain_order_and_timeouts() {
    let chain = default_proxy_chain();
    let names: Vec<_> = chain.iter().map(Strategy::name).collect();
    assert_eq!(names, vec!["all_origins", "cors_proxy", "direct"]);
    assert!(chain.iter().all(|s| s.timeout() == Duration::from_secs(6)));
  }

  #[test]
  fn test_strategy_from_yaml() {
    let chain: Vec<Strategy> = serde_yaml::from_str(
      "- { kind: cors_proxy, endpoint: 'https://cors.test' }\n- { kind: direct, timeout_ms: 9000 }\n",
    )
    .unwrap();
    assert_eq!(chain[0].timeout(), Duration::from_millis(PROXY_TIMEOUT_MS));
    assert_eq!(chain[1], Strategy::direct(Duration::from_secs(9)));
  }
}
