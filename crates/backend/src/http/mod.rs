//! HTTP base shared by the service clients.
//!
//! GET responses are cached by full URL and retried with exponential backoff.
//! POSTs are sent once and never cached. Only successfully decoded responses
//! enter the cache, so a failed request never poisons later ones.

mod cache;
mod retry;

use std::sync::Arc;

pub use cache::{CacheStats, ResponseCache};
pub use retry::{RetryConfig, is_retryable_error, with_retry};
use reqwest::Url;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

use crate::domain::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
  #[error("Request failed: {0}")]
  Request(#[from] reqwest::Error),
  #[error("Service returned {status}: {body}")]
  Status { status: u16, body: String },
  #[error("Failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),
  #[error("Request timed out")]
  Timeout,
  #[error("Network error: {0}")]
  Network(String),
  #[error("Invalid URL: {0}")]
  InvalidUrl(String),
}

impl HttpError {
  pub fn status(&self) -> Option<u16> {
    match self {
      HttpError::Status { status, .. } => Some(*status),
      _ => None,
    }
  }
}

/// Envelope of every file-explorer-service response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestResponse<T> {
  #[serde(default = "Vec::new")]
  pub data: Vec<T>,
  #[serde(default)]
  pub has_more: bool,
  #[serde(default)]
  pub offset: usize,
  #[serde(default)]
  pub response_type: String,
  #[serde(default)]
  pub total_count: Option<usize>,
}

impl<T> RestResponse<T> {
  pub fn success(data: Vec<T>) -> Self {
    Self {
      total_count: Some(data.len()),
      data,
      has_more: false,
      offset: 0,
      response_type: "SUCCESS".to_string(),
    }
  }

  pub fn into_first(self) -> Option<T> {
    self.data.into_iter().next()
  }
}

pub struct HttpClient {
  client: reqwest::Client,
  base_url: RwLock<String>,
  api_path: String,
  cache: ResponseCache,
  retry: RetryConfig,
}

impl HttpClient {
  pub fn new(base_url: impl Into<String>, api_path: impl Into<String>, cache: ResponseCache, retry: RetryConfig) -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url: RwLock::new(base_url.into()),
      api_path: api_path.into(),
      cache,
      retry,
    }
  }

  pub fn from_config(config: &Config) -> Self {
    Self::new(
      config.service.resolved_base_url(),
      config.service.api_path.clone(),
      ResponseCache::from_config(&config.cache),
      RetryConfig::from(&config.retry),
    )
  }

  pub fn into_shared(self) -> Arc<Self> {
    Arc::new(self)
  }

  pub async fn base_url(&self) -> String {
    self.base_url.read().await.clone()
  }

  /// Point the client at another service root. Cached responses belong to the old root and are dropped.
  pub async fn set_base_url(&self, base_url: impl Into<String>) {
    let base_url = base_url.into();
    let mut current = self.base_url.write().await;
    if *current != base_url {
      debug!(from = %current.as_str(), to = %base_url, "Changing service base URL");
      *current = base_url;
      self.cache.clear();
    }
  }

  /// Full URL of an API path such as `files/count?Gene=LMNB1`.
  pub async fn url(&self, path: &str) -> Result<String, HttpError> {
    let base = self.base_url.read().await;
    let mut url = base.trim_end_matches('/').to_string();
    let api_path = self.api_path.trim_matches('/');
    if !api_path.is_empty() {
      url.push('/');
      url.push_str(api_path);
    }
    url.push('/');
    url.push_str(path.trim_start_matches('/'));

    Url::parse(&url).map_err(|e| HttpError::InvalidUrl(format!("{}: {}", url, e)))?;
    Ok(url)
  }

  /// Cached, retried GET of a JSON envelope.
  #[tracing::instrument(level = "debug", skip(self))]
  pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<RestResponse<T>, HttpError> {
    let url = self.url(path).await?;

    if let Some(body) = self.cache.get(&url).await {
      trace!(url = %url, "Response cache hit");
      return Ok(serde_json::from_str(&body)?);
    }

    let body = with_retry(&self.retry, &url, || self.fetch_text(&url)).await?;
    let response: RestResponse<T> = serde_json::from_str(&body).inspect_err(|e| {
      warn!(url = %url, err = %e, "Undecodable response, not caching");
    })?;
    self.cache.insert(url, Arc::from(body)).await;
    Ok(response)
  }

  /// Uncached, retried GET returning the raw body.
  pub async fn get_text(&self, path: &str) -> Result<String, HttpError> {
    let url = self.url(path).await?;
    with_retry(&self.retry, &url, || self.fetch_text(&url)).await
  }

  /// Single-attempt JSON POST.
  #[tracing::instrument(level = "debug", skip(self, body))]
  pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<RestResponse<T>, HttpError>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    let url = self.url(path).await?;
    let send = self.client.post(&url).json(body).send();
    let response = match tokio::time::timeout(self.retry.request_timeout, send).await {
      Ok(result) => result.map_err(map_send_error)?,
      Err(_) => {
        warn!(url = %url, "POST timed out");
        return Err(HttpError::Timeout);
      }
    };
    let text = read_success_body(&url, response).await?;
    Ok(serde_json::from_str(&text)?)
  }

  pub async fn cache_stats(&self) -> CacheStats {
    self.cache.stats().await
  }

  async fn fetch_text(&self, url: &str) -> Result<String, HttpError> {
    let response = self.client.get(url).send().await.map_err(map_send_error)?;
    read_success_body(url, response).await
  }
}

fn map_send_error(e: reqwest::Error) -> HttpError {
  if e.is_timeout() {
    HttpError::Timeout
  } else if e.is_connect() || e.is_request() {
    HttpError::Network(e.to_string())
  } else {
    HttpError::Request(e)
  }
}

async fn read_success_body(url: &str, response: reqwest::Response) -> Result<String, HttpError> {
  let status = response.status();
  trace!(url = %url, status = %status, "Received response");

  if !status.is_success() {
    let body = response.text().await.unwrap_or_default();
    debug!(url = %url, status = %status, "Service returned an error status");
    return Err(HttpError::Status {
      status: status.as_u16(),
      body,
    });
  }

  response.text().await.map_err(map_send_error)
}
