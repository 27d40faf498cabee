//! Resilient fetcher: one logical URL, an ordered chain of strategies.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::strategy::Strategy;
use super::transport::{AttemptError, Transport};

/// Record of one strategy tried during a fetch.
#[derive(Debug, Clone)]
pub struct Attempt {
  pub strategy: &'static str,
  pub error: Option<AttemptError>,
}

/// Parsed value (if any strategy succeeded) plus every attempt made.
#[derive(Debug)]
pub struct FetchOutcome<T> {
  pub value: Option<T>,
  pub attempts: Vec<Attempt>,
}

/// Tries each strategy in order until one returns a 2xx body that parses.
///
/// There is no retry of a strategy and no backoff. The worst case is the sum
/// of the chain's timeouts. A timed-out attempt is dropped, so its response
/// can never be seen later.
#[derive(Clone)]
pub struct Fetcher {
  transport: Arc<dyn Transport>,
  chain: Arc<[Strategy]>,
}

impl Fetcher {
  pub fn new(transport: Arc<dyn Transport>, chain: Vec<Strategy>) -> Self {
    Self {
      transport,
      chain: chain.into(),
    }
  }

  /// Fetcher for providers that need no proxy.
  pub fn direct(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
    Self::new(transport, vec![Strategy::direct(timeout)])
  }

  /// Upper bound on how long a fetch can take.
  pub fn time_budget(&self) -> Duration {
    self.chain.iter().map(Strategy::timeout).sum()
  }

  pub async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Option<T> {
    self.fetch_traced(url).await.value
  }

  pub async fn fetch_json(&self, url: &str) -> Option<serde_json::Value> {
    self.fetch(url).await
  }

  pub async fn fetch_traced<T: DeserializeOwned>(&self, url: &str) -> FetchOutcome<T> {
    let mut attempts = Vec::with_capacity(self.chain.len());

    for strategy in self.chain.iter() {
      match self.attempt::<T>(strategy, url).await {
        Ok(value) => {
          attempts.push(Attempt {
            strategy: strategy.name(),
            error: None,
          });
          return FetchOutcome {
            value: Some(value),
            attempts,
          };
        }
        Err(e) => {
          debug!(strategy = strategy.name(), url = %redact(url), error = %e, "fetch attempt failed");
          attempts.push(Attempt {
            strategy: strategy.name(),
            error: Some(e),
          });
        }
      }
    }

    warn!(url = %redact(url), attempts = attempts.len(), "all fetch strategies failed");
    FetchOutcome {
      value: None,
      attempts,
    }
  }

  async fn attempt<T: DeserializeOwned>(
    &self,
    strategy: &Strategy,
    url: &str,
  ) -> Result<T, AttemptError> {
    let target = strategy.rewrite(url);
    let timeout = strategy.timeout();

    let response = tokio::time::timeout(timeout, self.transport.get(&target))
      .await
      .map_err(|_| AttemptError::Timeout(timeout))??;

    if !response.is_success() {
      return Err(AttemptError::Status(response.status));
    }

    serde_json::from_str(&response.body).map_err(|e| AttemptError::Parse(e.to_string()))
  }
}

/// Drop the query string so API keys stay out of logs.
fn redact(url: &str) -> &str {
  url.split_once('?').map(|(base, _)| base).unwrap_or(url)
}
