// Retry with exponential backoff for idempotent requests
//
// - Exponential backoff with optional jitter, capped at max_backoff
// - Retry on 429, 502, 503, 504, network errors and timeouts
// - Per-attempt timeout

use std::{future::Future, time::Duration};

use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use super::HttpError;
use crate::domain::config::RetrySettings;

/// Configuration for retried HTTP operations
#[derive(Debug, Clone)]
pub struct RetryConfig {
  /// Maximum number of retry attempts
  pub max_retries: u32,
  /// Initial backoff duration
  pub initial_backoff: Duration,
  /// Maximum backoff duration
  pub max_backoff: Duration,
  /// Backoff multiplier (exponential factor)
  pub backoff_multiplier: f64,
  /// Whether to add jitter to backoff
  pub add_jitter: bool,
  /// Timeout of a single attempt
  pub request_timeout: Duration,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self::from(&RetrySettings::default())
  }
}

impl From<&RetrySettings> for RetryConfig {
  fn from(settings: &RetrySettings) -> Self {
    Self {
      max_retries: settings.max_retries,
      initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
      max_backoff: Duration::from_millis(settings.max_backoff_ms),
      backoff_multiplier: settings.backoff_multiplier,
      add_jitter: settings.add_jitter,
      request_timeout: Duration::from_secs(settings.request_timeout_secs),
    }
  }
}

impl RetryConfig {
  /// Single attempt, no backoff.
  pub fn no_retry() -> Self {
    Self {
      max_retries: 0,
      ..Default::default()
    }
  }

  /// Calculate backoff duration for a given attempt
  pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
    let base = self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
    let mut backoff = Duration::from_secs_f64(base.min(self.max_backoff.as_secs_f64()));

    if self.add_jitter {
      // Add up to 25% jitter
      let jitter_factor = 1.0 + (rand_f64() * 0.25);
      backoff = Duration::from_secs_f64(backoff.as_secs_f64() * jitter_factor);
    }

    backoff.min(self.max_backoff)
  }
}

/// A simple pseudo-random number generator for jitter
fn rand_f64() -> f64 {
  use std::time::{SystemTime, UNIX_EPOCH};

  let nanos = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .subsec_nanos();

  (nanos as f64 / u32::MAX as f64).fract()
}

/// Check if an error is worth retrying
pub fn is_retryable_error(error: &HttpError) -> bool {
  match error {
    HttpError::Network(_) | HttpError::Timeout => true,
    HttpError::Status { status, .. } => matches!(status, 429 | 502 | 503 | 504),
    _ => false,
  }
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or retries run out.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, url: &str, mut attempt_fn: F) -> Result<T, HttpError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, HttpError>>,
{
  let max_retries = config.max_retries;
  let mut last_error = None;

  for attempt in 0..=max_retries {
    if attempt > 0 {
      let backoff = config.backoff_for_attempt(attempt - 1);
      trace!(backoff_ms = backoff.as_millis(), "Applying backoff before retry");
      debug!(
        url = %url,
        attempt = attempt,
        max_retries = max_retries,
        backoff_ms = backoff.as_millis(),
        "Retrying request after backoff"
      );
      sleep(backoff).await;
    }

    match tokio::time::timeout(config.request_timeout, attempt_fn()).await {
      Ok(Ok(result)) => {
        if attempt > 0 {
          info!(url = %url, attempt = attempt, "Request succeeded after retry");
        }
        return Ok(result);
      }
      Ok(Err(e)) => {
        if is_retryable_error(&e) && attempt < max_retries {
          warn!(
            url = %url,
            attempt = attempt + 1,
            max_retries = max_retries,
            err = %e,
            "Retryable error, will retry"
          );
          last_error = Some(e);
          continue;
        }
        if attempt == max_retries && is_retryable_error(&e) {
          warn!(
            url = %url,
            attempt = attempt + 1,
            max_retries = max_retries,
            err = %e,
            "All retries exhausted"
          );
        }
        return Err(e);
      }
      Err(_) => {
        warn!(
          url = %url,
          attempt = attempt + 1,
          max_retries = max_retries,
          timeout_ms = config.request_timeout.as_millis(),
          "Request timed out"
        );
        last_error = Some(HttpError::Timeout);
      }
    }
  }

  warn!(url = %url, max_retries = max_retries, "All retries exhausted");
  Err(last_error.unwrap_or(HttpError::Timeout))
}
