//! HTTP seam used by the fetcher.

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use thiserror::Error;

/// Why a single fetch attempt did not produce a value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptError {
  #[error("transport error: {0}")]
  Transport(String),

  #[error("unexpected status {0}")]
  Status(u16),

  #[error("timed out after {0:?}")]
  Timeout(Duration),

  #[error("body did not parse: {0}")]
  Parse(String),
}

/// Status and body of a completed GET.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: u16,
  pub body: String,
}

impl HttpResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

#[async_trait]
pub trait Transport: Send + Sync {
  /// Issue a GET for `url` and read the whole body.
  async fn get(&self, url: &str) -> Result<HttpResponse, AttemptError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
  client: reqwest::Client,
}

impl ReqwestTransport {
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("finboard/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { client })
  }
}

/// reqwest puts the request URL, API keys included, in its error text.
fn transport_error(e: reqwest::Error) -> AttemptError {
  AttemptError::Transport(e.without_url().to_string())
}

#[async_trait]
impl Transport for ReqwestTransport {
  async fn get(&self, url: &str) -> Result<HttpResponse, AttemptError> {
    let response = self
      .client
      .get(url)
      .send()
      .await
      .map_err(transport_error)?;

    let status = response.status().as_u16();
    let body = response
      .text()
      .await
      .map_err(transport_error)?;

    Ok(HttpResponse { status, body })
  }
}
