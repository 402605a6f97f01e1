//! Domain types - core business entities
//!
//! Value objects shared by the service clients, the browsing state and export.
//! These types are independent of transport concerns.

pub mod annotation;
pub mod config;
pub mod dataset;
pub mod file;
pub mod filter;
pub mod provenance;
pub mod range;
