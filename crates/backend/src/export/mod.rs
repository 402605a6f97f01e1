//! CSV manifest export.

pub mod manifest;

use std::io::Write;

pub use manifest::{ExportError, ManifestOptions, ManifestWriter, quote_field, write_manifest};
use tracing::info;

use crate::{
  domain::filter::FileQuery,
  service::{FileService, ServiceError},
};

#[derive(Debug, thiserror::Error)]
pub enum ExportQueryError {
  #[error(transparent)]
  Export(#[from] ExportError),
  #[error(transparent)]
  Service(#[from] ServiceError),
}

/// Write a manifest of every file matching `query`, fetching one page at a time.
pub async fn export_query<W: Write>(
  service: &dyn FileService,
  query: &FileQuery,
  page_size: usize,
  writer: W,
  options: &ManifestOptions,
) -> Result<usize, ExportQueryError> {
  let page_size = page_size.max(1);
  let total = service.count_matching_files(query).await?;
  let mut manifest = ManifestWriter::new(writer, options)?;

  let mut page = 0;
  while page * page_size < total {
    let files = service.get_files(query, page, page_size).await?;
    if files.is_empty() {
      break;
    }
    manifest.write_files(&files)?;
    page += 1;
  }

  let rows = manifest.finish()?;
  info!(query = %query.to_query_string(), rows, "Exported manifest");
  Ok(rows)
}
