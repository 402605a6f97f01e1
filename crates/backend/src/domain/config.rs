//! Configuration for BioFile Finder.
//!
//! Config priority: project-relative (./biofile-finder.toml) > user (~/.config/biofile-finder/config.toml)
//! > defaults. `BFF_BASE_URL` overrides the service URL regardless of source.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const PROJECT_CONFIG_FILE: &str = "biofile-finder.toml";
pub const BASE_URL_ENV: &str = "BFF_BASE_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("Failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("Invalid config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

// ============================================================================
// Service Configuration
// ============================================================================

/// Deployment of the file-explorer-service to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  #[default]
  Production,
  Staging,
  Localhost,
}

impl Environment {
  pub fn base_url(&self) -> &'static str {
    match self {
      Environment::Production => "https://production.int.allencell.org",
      Environment::Staging => "https://staging.int.allencell.org",
      Environment::Localhost => "http://localhost:9081",
    }
  }
}

impl std::str::FromStr for Environment {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "production" | "prod" => Ok(Environment::Production),
      "staging" | "stg" => Ok(Environment::Staging),
      "localhost" | "local" => Ok(Environment::Localhost),
      _ => Err(format!("Unknown environment: {}. Use: production, staging, localhost", s)),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
  /// Which deployment to use when `base_url` is not set
  pub environment: Environment,

  /// Explicit service root, e.g. "http://my-host:9081" (overrides `environment`)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub base_url: Option<String>,

  /// Path prefix of the REST API below the service root
  pub api_path: String,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      environment: Environment::Production,
      base_url: None,
      api_path: "file-explorer-service/1.0".to_string(),
    }
  }
}

impl ServiceConfig {
  /// Effective service root: `BFF_BASE_URL` > `base_url` > environment default.
  pub fn resolved_base_url(&self) -> String {
    if let Ok(url) = std::env::var(BASE_URL_ENV)
      && !url.trim().is_empty()
    {
      return url;
    }
    self
      .base_url
      .clone()
      .unwrap_or_else(|| self.environment.base_url().to_string())
  }
}

// ============================================================================
// Cache Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Maximum number of cached GET responses (LRU)
  pub max_responses: u64,

  /// Time-to-live for cached responses in seconds (unset = until evicted)
  #[serde(skip_serializing_if = "Option::is_none")]
  pub response_ttl_secs: Option<u64>,

  /// Maximum number of file records cached per file set
  pub max_files_per_set: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      max_responses: 1000,
      response_ttl_secs: None,
      max_files_per_set: 10_000,
    }
  }
}

// ============================================================================
// Retry Configuration
// ============================================================================

/// Retry policy for GET requests. POSTs are never retried.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
  /// Retries after the first attempt (0 disables retrying)
  pub max_retries: u32,

  /// Backoff before the first retry, in milliseconds
  pub initial_backoff_ms: u64,

  /// Upper bound on any single backoff, in milliseconds
  pub max_backoff_ms: u64,

  /// Factor applied to the backoff after each attempt
  pub backoff_multiplier: f64,

  /// Add up to 25% random jitter to each backoff
  pub add_jitter: bool,

  /// Timeout of a single request attempt, in seconds
  pub request_timeout_secs: u64,
}

impl Default for RetrySettings {
  fn default() -> Self {
    Self {
      max_retries: 3,
      initial_backoff_ms: 100,
      max_backoff_ms: 10_000,
      backoff_multiplier: 2.0,
      add_jitter: true,
      request_timeout_secs: 30,
    }
  }
}

// ============================================================================
// Fetch Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
  /// Page size used when fetching every file id of a query
  pub id_page_size: usize,

  /// Largest number of rows requested by a single windowed fetch
  pub max_batch_size: usize,

  /// Rows loaded beyond the visible window in each direction
  pub overscan: usize,

  /// Maximum windowed fetches in flight at once
  pub max_concurrent_fetches: usize,
}

impl Default for FetchConfig {
  fn default() -> Self {
    Self {
      id_page_size: 1000,
      max_batch_size: 100,
      overscan: 10,
      max_concurrent_fetches: 4,
    }
  }
}

// ============================================================================
// Export Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
  /// Written in place of an annotation the file has no value for
  pub missing_value: String,

  /// Joins multiple values of one annotation within a cell
  pub multi_value_separator: String,

  /// Write a header row of annotation display names
  pub include_header: bool,

  /// Format values for display (dates, sizes, durations) instead of writing raw values
  pub format_values: bool,
}

impl Default for ExportConfig {
  fn default() -> Self {
    Self {
      missing_value: String::new(),
      multi_value_separator: ";".to_string(),
      include_header: true,
      format_values: true,
    }
  }
}

// ============================================================================
// Logging Configuration
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
  /// Log level: "off", "error", "warn", "info", "debug", "trace"
  /// Default: "warn" (RUST_LOG takes precedence)
  pub level: String,

  /// Also write logs to a rolling file under the data directory
  pub log_to_file: bool,

  /// Log file rotation: "daily", "hourly", "never"
  pub rotation: String,
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: "warn".to_string(),
      log_to_file: false,
      rotation: "daily".to_string(),
    }
  }
}

// ============================================================================
// Main Configuration
// ============================================================================

/// BioFile Finder configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Metadata service location
  pub service: ServiceConfig,

  /// Response and file caches
  pub cache: CacheConfig,

  /// Retry/backoff for GET requests
  pub retry: RetrySettings,

  /// Windowed and bulk fetching
  pub fetch: FetchConfig,

  /// CSV manifest defaults
  pub export: ExportConfig,

  /// Logging
  pub logging: LoggingConfig,
}

impl Config {
  /// Load config for a working directory, with fallback to user config, then defaults.
  ///
  /// Unreadable or invalid files are logged and skipped.
  pub fn load(cwd: &Path) -> Self {
    Self::load_with_source(cwd).0
  }

  /// Like [`Config::load`], also returning the file the config came from (`None` for defaults).
  pub fn load_with_source(cwd: &Path) -> (Self, Option<PathBuf>) {
    let candidates = std::iter::once(Self::project_config_path(cwd)).chain(Self::user_config_path());
    for path in candidates {
      if !path.exists() {
        continue;
      }
      match Self::load_file(&path) {
        Ok(config) => {
          debug!(path = %path.display(), "Loaded config");
          return (config, Some(path));
        }
        Err(e) => warn!(error = %e, "Ignoring config file"),
      }
    }

    (Self::default(), None)
  }

  pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Get the user-level config path
  pub fn user_config_path() -> Option<PathBuf> {
    Some(crate::dirs::default_config_dir().join("config.toml"))
  }

  /// Get the project-relative config path
  pub fn project_config_path(cwd: &Path) -> PathBuf {
    cwd.join(PROJECT_CONFIG_FILE)
  }

  /// Generate a default config file as a string
  pub fn generate_template() -> String {
    let defaults = Config::default();
    format!(
      r#"# BioFile Finder Configuration
# Place in ./{project_file} (project) or ~/.config/biofile-finder/config.toml (user)

# ============================================================================
# Metadata Service
# ============================================================================

[service]
# Environment: production, staging, or localhost
environment = "production"

# Explicit service root (overrides environment; BFF_BASE_URL overrides both)
# base_url = "http://localhost:9081"

api_path = "{api_path}"

# ============================================================================
# Caching
# ============================================================================

[cache]
# Maximum number of cached GET responses (least recently used are evicted)
max_responses = {max_responses}

# Expire cached responses after this many seconds (default: never)
# response_ttl_secs = 300

# Maximum file records kept per file set
max_files_per_set = {max_files_per_set}

# ============================================================================
# Retry (GET requests only)
# ============================================================================

[retry]
max_retries = {max_retries}
initial_backoff_ms = {initial_backoff_ms}
max_backoff_ms = {max_backoff_ms}
backoff_multiplier = {backoff_multiplier:.1}
add_jitter = true
request_timeout_secs = {request_timeout_secs}

# ============================================================================
# Fetching
# ============================================================================

[fetch]
# Page size when collecting every file id of a query
id_page_size = {id_page_size}

# Largest single windowed fetch
max_batch_size = {max_batch_size}

# Rows loaded beyond the visible window
overscan = {overscan}

max_concurrent_fetches = {max_concurrent_fetches}

# ============================================================================
# CSV Export
# ============================================================================

[export]
# Value written when a file has no value for a column
missing_value = ""

# Separator between multiple values in one cell
multi_value_separator = "{separator}"

include_header = true

# Write dates, sizes and durations as displayed rather than raw
format_values = true

# ============================================================================
# Logging
# ============================================================================

[logging]
# Level: off, error, warn, info, debug, trace (RUST_LOG takes precedence)
level = "{level}"

# Also log to a rolling file under the data directory
log_to_file = false

# Rotation: daily, hourly, never
rotation = "daily"
"#,
      project_file = PROJECT_CONFIG_FILE,
      api_path = defaults.service.api_path,
      max_responses = defaults.cache.max_responses,
      max_files_per_set = defaults.cache.max_files_per_set,
      max_retries = defaults.retry.max_retries,
      initial_backoff_ms = defaults.retry.initial_backoff_ms,
      max_backoff_ms = defaults.retry.max_backoff_ms,
      backoff_multiplier = defaults.retry.backoff_multiplier,
      request_timeout_secs = defaults.retry.request_timeout_secs,
      id_page_size = defaults.fetch.id_page_size,
      max_batch_size = defaults.fetch.max_batch_size,
      overscan = defaults.fetch.overscan,
      max_concurrent_fetches = defaults.fetch.max_concurrent_fetches,
      separator = defaults.export.multi_value_separator,
      level = defaults.logging.level,
    )
  }
}
