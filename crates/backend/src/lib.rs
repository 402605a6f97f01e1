pub mod browse;
pub mod dirs;
pub mod domain;
pub mod export;
pub mod http;
pub mod service;

pub use domain::{annotation, config, dataset, file, filter, provenance, range};
pub use service::{ServiceError, Services};
