//! Service clients for the file-explorer metadata service.
//!
//! Each concern is a trait with an HTTP implementation and an in-memory one:
//!
//! - [`file`] - File counts, pages of file records, selection aggregates
//! - [`annotation`] - Annotation definitions, values, and hierarchy lookups
//! - [`dataset`] - Dataset creation and lookup
//! - [`local`] - In-memory implementation of all three over a fixed file list

pub mod annotation;
pub mod dataset;
pub mod file;
pub mod local;
pub mod util;

use std::sync::Arc;

pub use annotation::{AnnotationService, HttpAnnotationService};
pub use dataset::{DatasetService, HttpDatasetService};
pub use file::{AggregateInfo, FileService, HttpFileService, IndexRange, SelectionRequest, SelectionSort};
pub use local::LocalFileService;
pub use util::ServiceError;

use crate::{domain::config::Config, http::HttpClient};

/// The set of services a front end works against.
#[derive(Clone)]
pub struct Services {
  pub files: Arc<dyn FileService>,
  pub annotations: Arc<dyn AnnotationService>,
  pub datasets: Arc<dyn DatasetService>,
  http: Option<Arc<HttpClient>>,
}

impl Services {
  /// HTTP services sharing one client (and so one response cache).
  pub fn from_config(config: &Config) -> Self {
    Self::from_http(HttpClient::from_config(config).into_shared())
  }

  pub fn from_http(http: Arc<HttpClient>) -> Self {
    Self {
      files: Arc::new(HttpFileService::new(http.clone())),
      annotations: Arc::new(HttpAnnotationService::new(http.clone())),
      datasets: Arc::new(HttpDatasetService::new(http.clone())),
      http: Some(http),
    }
  }

  pub fn local(service: LocalFileService) -> Self {
    let service = Arc::new(service);
    Self {
      files: service.clone(),
      annotations: service.clone(),
      datasets: service,
      http: None,
    }
  }

  /// The shared HTTP client, if these are remote services.
  pub fn http(&self) -> Option<&Arc<HttpClient>> {
    self.http.as_ref()
  }
}

#[cfg(test)]
pub(crate) mod __tests__;
