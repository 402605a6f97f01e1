//! Dataset commands (create, list, snippet)

use anyhow::{Context as _, Result, bail};
use biofile_finder::{
  browse::FileSelection,
  dataset::{CreateDatasetRequest, Dataset, PythonSnippet},
  range::NumericRange,
};
use tracing::info;

use super::{Context, QueryArgs, print_json};
use crate::format::format_table;

/// Create a dataset from every file matching the query
pub async fn cmd_dataset_create(
  ctx: &Context,
  name: &str,
  annotations: Vec<String>,
  expiration: Option<String>,
  fixed: bool,
  query: &QueryArgs,
) -> Result<()> {
  let file_set = ctx.file_set(query.to_query()?);
  let total = file_set.total_count().await.context("Failed to count files")?;
  if total == 0 {
    bail!("No files match the query; nothing to put in a dataset");
  }

  let mut selection = FileSelection::new();
  selection.select(&file_set, NumericRange::new(0, total - 1)?, None);

  let mut request = CreateDatasetRequest::new(name, annotations, selection.to_compact_selection_list());
  request.expiration = expiration;
  request.fixed = fixed;

  let dataset = ctx
    .services
    .datasets
    .create_dataset(&request)
    .await
    .context("Failed to create dataset")?;
  info!(name = %dataset.name, version = dataset.version, files = total, "Dataset created");

  if ctx.json {
    return print_json(&dataset);
  }
  println!("Created dataset '{}' version {} with {} files", dataset.name, dataset.version, total);
  println!();
  print_snippet(&dataset);
  Ok(())
}

pub async fn cmd_dataset_list(ctx: &Context) -> Result<()> {
  let datasets = ctx
    .services
    .datasets
    .get_datasets()
    .await
    .context("Failed to list datasets")?;

  if ctx.json {
    return print_json(&datasets);
  }
  if datasets.is_empty() {
    println!("No datasets");
    return Ok(());
  }

  let headers = vec![
    "Name".to_string(),
    "Version".to_string(),
    "Created".to_string(),
    "Created by".to_string(),
    "Fixed".to_string(),
  ];
  let rows: Vec<Vec<String>> = datasets
    .iter()
    .map(|d| {
      vec![
        d.name.clone(),
        d.version.to_string(),
        d.created.clone().unwrap_or_default(),
        d.created_by.clone().unwrap_or_default(),
        if d.fixed { "yes" } else { "no" }.to_string(),
      ]
    })
    .collect();
  print!("{}", format_table(&headers, &rows));
  Ok(())
}

pub async fn cmd_dataset_snippet(ctx: &Context, name: &str, version: Option<u32>) -> Result<()> {
  let dataset = ctx
    .services
    .datasets
    .get_dataset(name, version)
    .await
    .with_context(|| format!("Failed to load dataset '{}'", name))?;

  if ctx.json {
    return print_json(&PythonSnippet::for_dataset(&dataset));
  }
  print_snippet(&dataset);
  Ok(())
}

fn print_snippet(dataset: &Dataset) {
  let snippet = PythonSnippet::for_dataset(dataset);
  println!("Setup:");
  println!("  {}", snippet.setup);
  println!();
  println!("Python:");
  for line in snippet.code.lines() {
    println!("  {}", line);
  }
}
