//! Plain-text rendering of command output.
//!
//! Tables are left-aligned with two-space gutters; cells are display-formatted
//! through their annotation so sizes, dates and booleans read the way users expect.

use biofile_finder::{annotation::Annotation, browse::FolderNode, file::FileDetail, provenance::EdgeView};
use serde_json::{Value, json};

const GUTTER: &str = "  ";
const MAX_CELL_WIDTH: usize = 48;

/// Render rows under a header, padding every column to its widest cell.
pub fn format_table(headers: &[String], rows: &[Vec<String>]) -> String {
  let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
  for row in rows {
    for (i, cell) in row.iter().enumerate() {
      if let Some(width) = widths.get_mut(i) {
        *width = (*width).max(cell.chars().count());
      }
    }
  }

  let mut out = String::new();
  let mut push_row = |cells: &[String]| {
    let line: Vec<String> = cells
      .iter()
      .zip(&widths)
      .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
      .collect();
    out.push_str(line.join(GUTTER).trim_end());
    out.push('\n');
  };

  push_row(headers);
  let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
  push_row(&rule);
  for row in rows {
    push_row(row);
  }
  out
}

pub fn format_annotations(annotations: &[Annotation]) -> String {
  let headers = vec![
    "Name".to_string(),
    "Display name".to_string(),
    "Type".to_string(),
    "Units".to_string(),
  ];
  let rows: Vec<Vec<String>> = annotations
    .iter()
    .map(|a| {
      vec![
        a.name.clone(),
        a.display_name.clone(),
        a.annotation_type.as_str().to_string(),
        a.units.clone().unwrap_or_default(),
      ]
    })
    .collect();
  format_table(&headers, &rows)
}

pub fn format_file_table<'a>(columns: &[Annotation], files: impl IntoIterator<Item = &'a FileDetail>) -> String {
  let headers: Vec<String> = columns.iter().map(|c| c.display_name.clone()).collect();
  let rows: Vec<Vec<String>> = files
    .into_iter()
    .map(|file| {
      columns
        .iter()
        .map(|c| truncate(&c.display_value(file).unwrap_or_default(), MAX_CELL_WIDTH))
        .collect()
    })
    .collect();
  format_table(&headers, &rows)
}

/// Indented folder tree with file counts.
pub fn format_folder_tree(nodes: &[FolderNode]) -> String {
  let mut out = String::new();
  write_folders(&mut out, nodes, 0);
  out
}

fn write_folders(out: &mut String, nodes: &[FolderNode], depth: usize) {
  for node in nodes {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&format!("{} ({})\n", node.value, node.file_count));
    write_folders(out, &node.children, depth + 1);
  }
}

pub fn folder_to_json(node: &FolderNode) -> Value {
  json!({
    "path": node.path,
    "value": node.value,
    "fileCount": node.file_count,
    "children": node.children.iter().map(folder_to_json).collect::<Vec<_>>(),
  })
}

pub fn format_edges(edges: &[EdgeView]) -> String {
  let headers = vec![
    "Parent".to_string(),
    "Relationship".to_string(),
    "Child".to_string(),
    "File".to_string(),
  ];
  let rows: Vec<Vec<String>> = edges
    .iter()
    .map(|e| vec![e.parent.clone(), e.relationship.clone(), e.child.clone(), e.file_id.clone()])
    .collect();
  format_table(&headers, &rows)
}

fn truncate(value: &str, max: usize) -> String {
  if value.chars().count() <= max {
    return value.to_string();
  }
  let kept: String = value.chars().take(max.saturating_sub(3)).collect();
  format!("{}...", kept)
}

#[cfg(test)]
mod tests {
  use biofile_finder::annotation::{AnnotationType, AnnotationValue};
  use pretty_assertions::assert_eq;

  use super::*;

  fn s(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
  }

  #[test]
  fn test_format_table_pads_columns() {
    let table = format_table(&s(&["Name", "Size"]), &[s(&["a.czi", "1 KB"]), s(&["long_name.czi", "2 MB"])]);
    assert_eq!(
      table,
      "Name           Size\n-------------  ----\na.czi          1 KB\nlong_name.czi  2 MB\n"
    );
  }

  #[test]
  fn test_format_file_table_uses_display_values() {
    let columns = vec![
      Annotation::new("file_name", "File name", AnnotationType::Text),
      Annotation::new("file_size", "File size", AnnotationType::Number).with_units("bytes"),
      Annotation::new("Gene", "Gene", AnnotationType::Text),
    ];
    let file = FileDetail {
      file_id: "f1".to_string(),
      file_name: "a.czi".to_string(),
      file_path: "/a.czi".to_string(),
      file_size: Some(1500),
      uploaded: None,
      thumbnail: None,
      annotations: vec![],
    };

    let table = format_file_table(&columns, [&file]);
    assert_eq!(table.lines().nth(2), Some("a.czi      1.5 KB"));
  }

  #[test]
  fn test_format_folder_tree() {
    let tree = vec![FolderNode {
      path: s(&["AICS-10"]),
      value: AnnotationValue::from("AICS-10"),
      file_count: 3,
      children: vec![FolderNode {
        path: s(&["AICS-10", "LMNB1"]),
        value: AnnotationValue::from("LMNB1"),
        file_count: 2,
        children: vec![],
      }],
    }];
    assert_eq!(format_folder_tree(&tree), "AICS-10 (3)\n  LMNB1 (2)\n");
    assert_eq!(folder_to_json(&tree[0])["children"][0]["fileCount"], 2);
  }

  #[test]
  fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("abcdefghij", 6), "abc...");
  }
}
