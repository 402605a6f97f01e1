//! Browsing commands (annotations, values, files, count, ids, group)

use anyhow::{Context as _, Result};
use biofile_finder::{
  annotation::Annotation,
  browse::{AnnotationHierarchy, FetchOutcome, FileIdFetcher, WindowedFetcher},
};
use tracing::warn;

use super::{Context, QueryArgs, print_json};
use crate::format::{format_annotations, format_file_table, format_folder_tree};

/// Columns shown by `bff files` when none are requested
const DEFAULT_COLUMNS: &[&str] = &["file_name", "file_size", "uploaded"];

pub async fn cmd_annotations(ctx: &Context) -> Result<()> {
  let annotations = ctx
    .services
    .annotations
    .fetch_annotations()
    .await
    .context("Failed to fetch annotations")?;

  if ctx.json {
    return print_json(&annotations);
  }
  print!("{}", format_annotations(&annotations));
  Ok(())
}

pub async fn cmd_values(ctx: &Context, annotation: &str) -> Result<()> {
  let values = ctx
    .services
    .annotations
    .fetch_values(annotation)
    .await
    .with_context(|| format!("Failed to fetch values of '{}'", annotation))?;

  if ctx.json {
    return print_json(&values);
  }

  let definition = find_annotation(ctx, annotation).await?;
  for value in &values {
    match &definition {
      Some(a) => println!("{}", a.format_value(value)),
      None => println!("{}", value),
    }
  }
  Ok(())
}

pub async fn cmd_files(ctx: &Context, query: &QueryArgs, offset: usize, limit: usize, columns: &[String]) -> Result<()> {
  let file_set = ctx.file_set(query.to_query()?);
  let total = file_set.total_count().await.context("Failed to count files")?;
  let Some(last) = last_row(offset, limit, total) else {
    if ctx.json {
      return print_json(&Vec::<()>::new());
    }
    println!("No files in rows {}..{} ({} total)", offset, offset.saturating_add(limit), total);
    return Ok(());
  };

  let fetcher = WindowedFetcher::from_config(file_set, &ctx.config.fetch);
  let rows = fetcher.rows(offset, last).await.context("Failed to fetch files")?;
  let files: Vec<_> = rows.into_iter().flatten().collect();

  if ctx.json {
    return print_json(&files.iter().map(|f| &**f).collect::<Vec<_>>());
  }

  let columns = resolve_columns(ctx, columns, DEFAULT_COLUMNS).await?;
  print!("{}", format_file_table(&columns, files.iter().map(|f| &**f)));
  println!("\nRows {}-{} of {}", offset + 1, last + 1, total);
  Ok(())
}

pub async fn cmd_count(ctx: &Context, query: &QueryArgs) -> Result<()> {
  let query = query.to_query()?;
  let count = ctx
    .services
    .files
    .count_matching_files(&query)
    .await
    .context("Failed to count files")?;

  if ctx.json {
    return print_json(&serde_json::json!({ "query": query.to_query_string(), "count": count }));
  }
  println!("{}", count);
  Ok(())
}

/// Collect ids on a background task; Ctrl-C cancels it.
pub async fn cmd_ids(ctx: &Context, query: &QueryArgs) -> Result<()> {
  let mut fetcher = FileIdFetcher::new(ctx.services.files.clone(), ctx.config.fetch.id_page_size);
  let fetch = fetcher.spawn(query.to_query()?);
  let mut progress = fetch.subscribe();

  let report = async {
    while progress.changed().await.is_ok() {
      let p = *progress.borrow_and_update();
      if let Some(total) = p.total {
        eprint!("\rFetched {}/{} file ids", p.fetched, total);
      }
    }
  };

  let outcome = tokio::select! {
    biased;

    _ = tokio::signal::ctrl_c() => {
      fetcher.cancel();
      warn!("Interrupted, file id fetch cancelled");
      return Ok(());
    }
    (outcome, _) = async { tokio::join!(fetch.wait(), report) } => outcome,
  };
  eprintln!();

  match outcome.context("Failed to fetch file ids")? {
    FetchOutcome::Complete(ids) if ctx.json => print_json(&ids),
    FetchOutcome::Complete(ids) => {
      for id in ids {
        println!("{}", id);
      }
      Ok(())
    }
    FetchOutcome::Cancelled => {
      eprintln!("Cancelled");
      Ok(())
    }
  }
}

pub async fn cmd_group(ctx: &Context, by: &[String], depth: Option<usize>, query: &QueryArgs) -> Result<()> {
  let query = query.to_query()?;
  let hierarchy = AnnotationHierarchy::new(by.iter().cloned(), query.filters().iter().cloned());
  let tree = hierarchy
    .build_tree(&*ctx.services.annotations, &*ctx.services.files, depth)
    .await
    .context("Failed to group files")?;

  if ctx.json {
    let json: Vec<_> = tree.iter().map(crate::format::folder_to_json).collect();
    return print_json(&json);
  }
  if tree.is_empty() {
    println!("No folders");
    return Ok(());
  }
  print!("{}", format_folder_tree(&tree));
  Ok(())
}

/// Last row shown for `limit` rows from `offset`, clamped to the set; `None` when nothing is shown.
fn last_row(offset: usize, limit: usize, total: usize) -> Option<usize> {
  if limit == 0 || offset >= total {
    return None;
  }
  Some(offset.saturating_add(limit - 1).min(total - 1))
}

async fn find_annotation(ctx: &Context, name: &str) -> Result<Option<Annotation>> {
  let annotations = ctx
    .services
    .annotations
    .fetch_annotations()
    .await
    .context("Failed to fetch annotations")?;
  Ok(annotations.into_iter().find(|a| a.name == name))
}

/// Annotation definitions for the requested column names, in order.
///
/// Names the service does not know are kept as plain text columns.
pub(super) async fn resolve_columns(ctx: &Context, names: &[String], defaults: &[&str]) -> Result<Vec<Annotation>> {
  let annotations = ctx
    .services
    .annotations
    .fetch_annotations()
    .await
    .context("Failed to fetch annotations")?;

  let names: Vec<String> = if names.is_empty() {
    defaults.iter().map(|s| s.to_string()).collect()
  } else {
    names.to_vec()
  };

  Ok(
    names
      .iter()
      .map(|name| {
        annotations.iter().find(|a| &a.name == name).cloned().unwrap_or_else(|| {
          warn!(annotation = %name, "Unknown annotation, showing raw values");
          Annotation::new(name.clone(), name.clone(), Default::default())
        })
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_last_row() {
    assert_eq!(last_row(0, 20, 100), Some(19));
    assert_eq!(last_row(90, 20, 100), Some(99));
    assert_eq!(last_row(5, usize::MAX, 100), Some(99));
    assert_eq!(last_row(100, 20, 100), None);
    assert_eq!(last_row(0, 0, 100), None);
  }
}
