//! LRU cache of GET response bodies keyed by full request URL.

use std::{sync::Arc, time::Duration};

use moka::future::Cache;

use crate::domain::config::CacheConfig;

pub struct ResponseCache {
  cache: Cache<String, Arc<str>>,
}

impl ResponseCache {
  /// Create a cache holding at most `capacity` responses.
  pub fn with_capacity(capacity: u64) -> Self {
    Self::build(capacity, None)
  }

  pub fn from_config(config: &CacheConfig) -> Self {
    Self::build(config.max_responses, config.response_ttl_secs.map(Duration::from_secs))
  }

  fn build(capacity: u64, ttl: Option<Duration>) -> Self {
    let mut builder = Cache::builder().max_capacity(capacity);
    if let Some(ttl) = ttl {
      builder = builder.time_to_live(ttl);
    }
    Self { cache: builder.build() }
  }

  pub async fn get(&self, url: &str) -> Option<Arc<str>> {
    self.cache.get(url).await
  }

  pub async fn insert(&self, url: String, body: Arc<str>) {
    self.cache.insert(url, body).await;
  }

  pub fn contains(&self, url: &str) -> bool {
    self.cache.contains_key(url)
  }

  /// Drop every cached response (e.g. when the service URL changes).
  pub fn clear(&self) {
    self.cache.invalidate_all();
  }

  /// Get cache statistics. Pending evictions are applied first so counts are exact.
  pub async fn stats(&self) -> CacheStats {
    self.cache.run_pending_tasks().await;
    CacheStats {
      entry_count: self.cache.entry_count(),
      weighted_size: self.cache.weighted_size(),
    }
  }
}

impl Default for ResponseCache {
  fn default() -> Self {
    Self::from_config(&CacheConfig::default())
  }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
  pub entry_count: u64,
  pub weighted_size: u64,
}
