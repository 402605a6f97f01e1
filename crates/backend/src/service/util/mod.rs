//! Shared utilities for the service clients.
//!
//! - `error` - Unified error type for service operations
//! - `query` - Percent-encoding query string builder

mod error;
mod query;

pub use error::ServiceError;
pub use query::QueryBuilder;
