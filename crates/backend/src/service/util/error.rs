//! Unified error type for service operations.

use crate::{domain::range::RangeError, http::HttpError};

/// Unified error type for service operations.
///
/// HTTP failures keep their transport detail; a 404 from the service is
/// surfaced as [`ServiceError::NotFound`] by the clients that can name the item.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
  /// Item was not found.
  #[error("{item_type} not found: {id}")]
  NotFound { item_type: &'static str, id: String },
  /// Input validation failed.
  #[error("Validation error: {0}")]
  Validation(String),
  /// Request to the metadata service failed.
  #[error("HTTP error: {0}")]
  Http(#[from] HttpError),
  /// Invalid index range.
  #[error("Range error: {0}")]
  Range(#[from] RangeError),
  /// Reading a local source failed.
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  /// Internal processing error.
  #[error("Internal error: {0}")]
  Internal(String),
}

impl ServiceError {
  /// Create a not-found error.
  pub fn not_found(item_type: &'static str, id: impl Into<String>) -> Self {
    Self::NotFound {
      item_type,
      id: id.into(),
    }
  }

  /// Create a validation error.
  pub fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }

  /// Create an internal error.
  pub fn internal(msg: impl Into<String>) -> Self {
    Self::Internal(msg.into())
  }

  /// Map an HTTP 404 to `NotFound`, passing other errors through.
  pub fn from_http(item_type: &'static str, id: impl Into<String>, error: HttpError) -> Self {
    match error.status() {
      Some(404) => Self::not_found(item_type, id),
      _ => Self::Http(error),
    }
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_http_maps_404() {
    let missing = HttpError::Status {
      status: 404,
      body: String::new(),
    };
    assert!(ServiceError::from_http("dataset", "abc", missing).is_not_found());

    let failed = HttpError::Status {
      status: 500,
      body: "boom".to_string(),
    };
    assert!(matches!(
      ServiceError::from_http("dataset", "abc", failed),
      ServiceError::Http(HttpError::Status { status: 500, .. })
    ));
  }

  #[test]
  fn test_messages() {
    assert_eq!(
      ServiceError::not_found("dataset", "my-set").to_string(),
      "dataset not found: my-set"
    );
    assert_eq!(ServiceError::validation("limit must be > 0").to_string(), "Validation error: limit must be > 0");
  }
}
