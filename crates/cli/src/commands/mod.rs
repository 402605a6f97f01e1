//! CLI command implementations

mod browse;
mod config;
mod dataset;
mod export;
mod provenance;

use std::{path::Path, sync::Arc};

use anyhow::{Context as _, Result, bail};
use biofile_finder::{
  Services,
  browse::{FileSelection, FileSet},
  config::Config,
  file::FileDetail,
  filter::{FileQuery, FileSort, Filter, SortOrder},
  range::NumericRange,
  service::LocalFileService,
};
use clap::Args;
use tracing::debug;

pub use browse::{cmd_annotations, cmd_count, cmd_files, cmd_group, cmd_ids, cmd_values};
pub use config::{cmd_config_init, cmd_config_show};
pub use dataset::{cmd_dataset_create, cmd_dataset_list, cmd_dataset_snippet};
pub use export::cmd_export;
pub use provenance::cmd_provenance;

/// Filters and sort shared by every command that works on a set of files.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
  /// Annotation value filter, NAME=VALUE (repeat for several values)
  #[arg(short, long = "filter", value_name = "NAME=VALUE")]
  pub filters: Vec<String>,
  /// Only files with any value for this annotation
  #[arg(long, value_name = "NAME")]
  pub include: Vec<String>,
  /// Only files without a value for this annotation
  #[arg(long, value_name = "NAME")]
  pub exclude: Vec<String>,
  /// Match filter values of this annotation as substrings
  #[arg(long, value_name = "NAME")]
  pub fuzzy: Vec<String>,
  /// Sort as NAME[:asc|desc] (default: uploaded:desc)
  #[arg(short, long, value_name = "NAME[:ORDER]")]
  pub sort: Option<String>,
}

impl QueryArgs {
  pub fn to_query(&self) -> Result<FileQuery> {
    let mut filters = Vec::new();
    for raw in &self.filters {
      filters.push(parse_filter(raw)?);
    }
    filters.extend(self.include.iter().map(Filter::include));
    filters.extend(self.exclude.iter().map(Filter::exclude));
    filters.extend(self.fuzzy.iter().map(Filter::fuzzy));

    let sort = match &self.sort {
      Some(raw) => parse_sort(raw)?,
      None => FileSort::default(),
    };
    Ok(FileQuery::new(filters, Some(sort)))
  }
}

pub fn parse_filter(raw: &str) -> Result<Filter> {
  match raw.split_once('=') {
    Some((name, value)) if !name.trim().is_empty() => Ok(Filter::value(name.trim(), value.trim())),
    _ => bail!("Invalid filter '{}': expected NAME=VALUE", raw),
  }
}

pub fn parse_sort(raw: &str) -> Result<FileSort> {
  let (name, order) = match raw.rsplit_once(':') {
    Some((name, order)) => (name, order),
    None => (raw, "asc"),
  };
  let order = match order.to_lowercase().as_str() {
    "asc" => SortOrder::Asc,
    "desc" => SortOrder::Desc,
    other => bail!("Invalid sort order '{}': use asc or desc", other),
  };
  if name.trim().is_empty() {
    bail!("Sort needs an annotation name");
  }
  Ok(FileSort::new(name.trim(), order))
}

/// Everything a command needs: effective config, services and output mode.
pub struct Context {
  pub config: Config,
  pub services: Services,
  pub json: bool,
}

impl Context {
  pub async fn new(config: Config, source: Option<&Path>, base_url: Option<String>, json: bool) -> Result<Self> {
    let services = match source {
      Some(path) => {
        let local = LocalFileService::from_json_file(path)
          .with_context(|| format!("Failed to load file source {}", path.display()))?;
        Services::local(local)
      }
      None => {
        let services = Services::from_config(&config);
        if let (Some(url), Some(http)) = (base_url, services.http()) {
          http.set_base_url(url).await;
        }
        services
      }
    };

    Ok(Self { config, services, json })
  }

  pub fn file_set(&self, query: FileQuery) -> Arc<FileSet> {
    Arc::new(FileSet::new(
      query,
      self.services.files.clone(),
      self.config.cache.max_files_per_set,
    ))
  }

  /// Every file matching `query`, in query order.
  pub async fn fetch_all_files(&self, query: FileQuery) -> Result<Vec<FileDetail>> {
    let file_set = self.file_set(query);
    let total = file_set.total_count().await.context("Failed to count files")?;
    if total == 0 {
      return Ok(Vec::new());
    }

    let mut selection = FileSelection::new();
    selection.select(&file_set, NumericRange::new(0, total - 1)?, None);
    let files = selection.fetch_all_details().await.context("Failed to fetch files")?;
    debug!(total, fetched = files.len(), "Fetched all matching files");
    Ok(files)
  }
}

pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_filter() {
    assert_eq!(parse_filter("Gene=LMNB1").unwrap(), Filter::value("Gene", "LMNB1"));
    assert_eq!(parse_filter("Cell line = AICS-10").unwrap(), Filter::value("Cell line", "AICS-10"));
    assert_eq!(parse_filter("Note=a=b").unwrap(), Filter::value("Note", "a=b"));
    assert!(parse_filter("Gene").is_err());
    assert!(parse_filter("=LMNB1").is_err());
  }

  #[test]
  fn test_parse_sort() {
    assert_eq!(parse_sort("file_size").unwrap(), FileSort::new("file_size", SortOrder::Asc));
    assert_eq!(parse_sort("uploaded:DESC").unwrap(), FileSort::new("uploaded", SortOrder::Desc));
    assert!(parse_sort("file_size:sideways").is_err());
    assert!(parse_sort(":asc").is_err());
  }

  #[test]
  fn test_query_args() {
    let args = QueryArgs {
      filters: vec!["Gene=LMNB1".to_string()],
      include: vec!["Dye".to_string()],
      ..Default::default()
    };
    let query = args.to_query().unwrap();
    assert_eq!(query.filters().len(), 2);
    assert_eq!(query.sort(), Some(&FileSort::default()));
  }
}
