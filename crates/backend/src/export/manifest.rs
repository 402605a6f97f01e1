//! CSV manifests: one row per file, one column per annotation.

use std::io::Write;

use tracing::debug;

use crate::domain::{
  annotation::{Annotation, AnnotationValue},
  config::ExportConfig,
  file::FileDetail,
};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("A manifest needs at least one column")]
  NoColumns,
}

#[derive(Debug, Clone)]
pub struct ManifestOptions {
  pub columns: Vec<Annotation>,
  pub missing_value: String,
  pub multi_value_separator: String,
  pub include_header: bool,
  /// Format values the way they are displayed instead of writing raw values
  pub format_values: bool,
}

impl ManifestOptions {
  pub fn new(columns: Vec<Annotation>) -> Self {
    Self::from_config(columns, &ExportConfig::default())
  }

  pub fn from_config(columns: Vec<Annotation>, config: &ExportConfig) -> Self {
    Self {
      columns,
      missing_value: config.missing_value.clone(),
      multi_value_separator: config.multi_value_separator.clone(),
      include_header: config.include_header,
      format_values: config.format_values,
    }
  }

  fn cell(&self, column: &Annotation, file: &FileDetail) -> String {
    match column.extract_from_file(file) {
      Some(values) if self.format_values => column.format_values(&values, &self.multi_value_separator),
      Some(values) => values
        .iter()
        .map(AnnotationValue::to_string)
        .collect::<Vec<_>>()
        .join(&self.multi_value_separator),
      None => self.missing_value.clone(),
    }
  }
}

/// Streams manifest rows to a writer, so large result sets can be written page by page.
pub struct ManifestWriter<'a, W: Write> {
  writer: W,
  options: &'a ManifestOptions,
  rows: usize,
}

impl<'a, W: Write> ManifestWriter<'a, W> {
  /// Writes the header row immediately when the options ask for one.
  pub fn new(mut writer: W, options: &'a ManifestOptions) -> Result<Self, ExportError> {
    if options.columns.is_empty() {
      return Err(ExportError::NoColumns);
    }
    if options.include_header {
      let header: Vec<&str> = options.columns.iter().map(|c| c.display_name.as_str()).collect();
      write_record(&mut writer, header)?;
    }
    Ok(Self {
      writer,
      options,
      rows: 0,
    })
  }

  pub fn write_file(&mut self, file: &FileDetail) -> Result<(), ExportError> {
    let cells: Vec<String> = self.options.columns.iter().map(|c| self.options.cell(c, file)).collect();
    write_record(&mut self.writer, cells.iter().map(String::as_str))?;
    self.rows += 1;
    Ok(())
  }

  pub fn write_files<'f>(&mut self, files: impl IntoIterator<Item = &'f FileDetail>) -> Result<(), ExportError> {
    for file in files {
      self.write_file(file)?;
    }
    Ok(())
  }

  /// Flush and return the number of file rows written.
  pub fn finish(mut self) -> Result<usize, ExportError> {
    self.writer.flush()?;
    debug!(rows = self.rows, columns = self.options.columns.len(), "Wrote manifest");
    Ok(self.rows)
  }
}

/// Write a complete manifest for `files`. Returns the number of file rows.
pub fn write_manifest<W: Write>(writer: W, files: &[FileDetail], options: &ManifestOptions) -> Result<usize, ExportError> {
  let mut manifest = ManifestWriter::new(writer, options)?;
  manifest.write_files(files)?;
  manifest.finish()
}

fn write_record<'s, W: Write>(writer: &mut W, fields: impl IntoIterator<Item = &'s str>) -> std::io::Result<()> {
  let line: Vec<String> = fields.into_iter().map(quote_field).collect();
  writer.write_all(line.join(",").as_bytes())?;
  writer.write_all(b"\r\n")
}

/// Quote a field when it contains a comma, quote, CR or LF, doubling embedded quotes.
pub fn quote_field(field: &str) -> String {
  if field.contains([',', '"', '\r', '\n']) {
    format!("\"{}\"", field.replace('"', "\"\""))
  } else {
    field.to_string()
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::domain::{annotation::AnnotationType, file::FileAnnotation};

  fn file(name: &str, annotations: Vec<(&str, Vec<AnnotationValue>)>) -> FileDetail {
    FileDetail {
      file_id: format!("id-{}", name),
      file_name: name.to_string(),
      file_path: format!("/data/{}", name),
      file_size: Some(2048),
      uploaded: None,
      thumbnail: None,
      annotations: annotations
        .into_iter()
        .map(|(n, values)| FileAnnotation {
          name: n.to_string(),
          values,
        })
        .collect(),
    }
  }

  fn columns() -> Vec<Annotation> {
    vec![
      Annotation::new("file_name", "File name", AnnotationType::Text),
      Annotation::new("Gene", "Gene", AnnotationType::Text),
      Annotation::new("file_size", "File size", AnnotationType::Number).with_units("bytes"),
    ]
  }

  fn render(files: &[FileDetail], options: &ManifestOptions) -> String {
    let mut out = Vec::new();
    write_manifest(&mut out, files, options).unwrap();
    String::from_utf8(out).unwrap()
  }

  #[test]
  fn test_quote_field() {
    assert_eq!(quote_field("plain"), "plain");
    assert_eq!(quote_field("a,b"), "\"a,b\"");
    assert_eq!(quote_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    assert_eq!(quote_field("two\nlines"), "\"two\nlines\"");
    assert_eq!(quote_field(""), "");
  }

  #[test]
  fn test_manifest_with_formatted_values() {
    let files = vec![
      file("a.czi", vec![("Gene", vec!["LMNB1".into(), "TOMM20".into()])]),
      file("b,c.czi", vec![]),
    ];
    let options = ManifestOptions::new(columns());

    assert_eq!(
      render(&files, &options),
      "File name,Gene,File size\r\na.czi,LMNB1;TOMM20,2.05 KB\r\n\"b,c.czi\",,2.05 KB\r\n"
    );
  }

  #[test]
  fn test_manifest_raw_values_without_header() {
    let files = vec![file("a.czi", vec![])];
    let options = ManifestOptions {
      missing_value: "N/A".to_string(),
      include_header: false,
      format_values: false,
      ..ManifestOptions::new(columns())
    };

    assert_eq!(render(&files, &options), "a.czi,N/A,2048\r\n");
  }

  #[test]
  fn test_manifest_counts_rows() {
    let files = vec![file("a", vec![]), file("b", vec![]), file("c", vec![])];
    let mut out = Vec::new();
    assert_eq!(write_manifest(&mut out, &files, &ManifestOptions::new(columns())).unwrap(), 3);
  }

  #[test]
  fn test_manifest_requires_columns() {
    let mut out = Vec::new();
    let result = write_manifest(&mut out, &[], &ManifestOptions::new(vec![]));
    assert!(matches!(result, Err(ExportError::NoColumns)));
    assert!(out.is_empty());
  }
}
