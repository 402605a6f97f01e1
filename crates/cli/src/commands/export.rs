//! CSV manifest export

use std::{
  fs::File,
  io::{BufWriter, Write},
  path::Path,
};

use anyhow::{Context as _, Result};
use biofile_finder::export::{ManifestOptions, export_query};

use super::{Context, QueryArgs, browse::resolve_columns};

const DEFAULT_COLUMNS: &[&str] = &["file_name", "file_path", "file_size"];

#[allow(clippy::too_many_arguments)]
pub async fn cmd_export(
  ctx: &Context,
  query: &QueryArgs,
  columns: &[String],
  output: Option<&Path>,
  missing_value: Option<String>,
  separator: Option<String>,
  no_header: bool,
  raw: bool,
) -> Result<()> {
  let query = query.to_query()?;
  let columns = resolve_columns(ctx, columns, DEFAULT_COLUMNS).await?;

  let mut options = ManifestOptions::from_config(columns, &ctx.config.export);
  if let Some(missing) = missing_value {
    options.missing_value = missing;
  }
  if let Some(separator) = separator {
    options.multi_value_separator = separator;
  }
  options.include_header &= !no_header;
  options.format_values &= !raw;

  let writer: Box<dyn Write> = match output {
    Some(path) => Box::new(BufWriter::new(
      File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
    )),
    None => Box::new(BufWriter::new(std::io::stdout().lock())),
  };

  let rows = export_query(
    &*ctx.services.files,
    &query,
    ctx.config.fetch.id_page_size,
    writer,
    &options,
  )
  .await
  .context("Export failed")?;

  if let Some(path) = output {
    eprintln!("Wrote {} rows to {}", rows, path.display());
  }
  Ok(())
}
