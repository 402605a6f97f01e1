//! Common test utilities for the HTTP service clients
//!
//! Every test runs against its own mockito server; clients are built with
//! short backoffs so retry tests stay fast.

use std::{sync::Arc, time::Duration};

use biofile_finder::{
  Services,
  http::{HttpClient, ResponseCache, RetryConfig},
};
use serde_json::{Value, json};

/// Retries quickly, three times.
#[allow(dead_code)]
pub fn fast_retry() -> RetryConfig {
  RetryConfig {
    max_retries: 3,
    initial_backoff: Duration::from_millis(1),
    max_backoff: Duration::from_millis(5),
    backoff_multiplier: 2.0,
    add_jitter: false,
    request_timeout: Duration::from_secs(5),
  }
}

/// Client rooted at the mock server with no API path prefix.
#[allow(dead_code)]
pub fn client(server: &mockito::ServerGuard, retry: RetryConfig) -> Arc<HttpClient> {
  HttpClient::new(server.url(), "", ResponseCache::with_capacity(100), retry).into_shared()
}

#[allow(dead_code)]
pub fn services(server: &mockito::ServerGuard) -> Services {
  Services::from_http(client(server, fast_retry()))
}

/// Wrap `data` in the service's response envelope.
#[allow(dead_code)]
pub fn envelope(data: Value) -> String {
  json!({
    "data": data,
    "hasMore": false,
    "offset": 0,
    "responseType": "SUCCESS"
  })
  .to_string()
}

#[allow(dead_code)]
pub fn file_json(id: &str, gene: &str) -> Value {
  json!({
    "file_id": id,
    "file_name": format!("{}.czi", id),
    "file_path": format!("/allen/{}.czi", id),
    "file_size": 1024,
    "uploaded": "2023-01-01T00:00:00Z",
    "annotations": [
      {"name": "Gene", "values": [gene]}
    ]
  })
}
