//! Annotations: named, typed metadata fields attached to files.

mod format;

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

pub use format::FormatError;

use super::file::FileDetail;

/// Top-level `FileDetail` fields that behave like annotations.
pub const FILE_ID: &str = "file_id";
pub const FILE_NAME: &str = "file_name";
pub const FILE_PATH: &str = "file_path";
pub const FILE_SIZE: &str = "file_size";
pub const UPLOADED: &str = "uploaded";
pub const THUMBNAIL: &str = "thumbnail";

/// Annotation value types as reported by the metadata service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AnnotationType {
  #[default]
  Text,
  Number,
  Date,
  DateTime,
  #[serde(rename = "YesNo", alias = "Boolean")]
  Boolean,
  Duration,
  Lookup,
  Dropdown,
}

impl AnnotationType {
  pub fn as_str(&self) -> &'static str {
    match self {
      AnnotationType::Text => "Text",
      AnnotationType::Number => "Number",
      AnnotationType::Date => "Date",
      AnnotationType::DateTime => "DateTime",
      AnnotationType::Boolean => "YesNo",
      AnnotationType::Duration => "Duration",
      AnnotationType::Lookup => "Lookup",
      AnnotationType::Dropdown => "Dropdown",
    }
  }
}

/// A single annotation value.
///
/// Values arrive as bare JSON scalars, so deserialization is untagged: booleans
/// first, then numbers, then strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationValue {
  Bool(bool),
  Number(f64),
  Text(String),
}

impl AnnotationValue {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      AnnotationValue::Text(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      AnnotationValue::Number(n) => Some(*n),
      AnnotationValue::Text(s) => s.trim().parse().ok(),
      AnnotationValue::Bool(_) => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      AnnotationValue::Bool(b) => Some(*b),
      AnnotationValue::Text(s) => match s.to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
      },
      AnnotationValue::Number(_) => None,
    }
  }

  fn rank(&self) -> u8 {
    match self {
      AnnotationValue::Bool(_) => 0,
      AnnotationValue::Number(_) => 1,
      AnnotationValue::Text(_) => 2,
    }
  }
}

impl Ord for AnnotationValue {
  fn cmp(&self, other: &Self) -> Ordering {
    match (self, other) {
      (AnnotationValue::Bool(a), AnnotationValue::Bool(b)) => a.cmp(b),
      (AnnotationValue::Number(a), AnnotationValue::Number(b)) => a.total_cmp(b),
      (AnnotationValue::Text(a), AnnotationValue::Text(b)) => a.cmp(b),
      _ => self.rank().cmp(&other.rank()),
    }
  }
}

impl PartialOrd for AnnotationValue {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl PartialEq for AnnotationValue {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for AnnotationValue {}

impl fmt::Display for AnnotationValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AnnotationValue::Bool(b) => write!(f, "{}", b),
      AnnotationValue::Number(n) => write!(f, "{}", n),
      AnnotationValue::Text(s) => f.write_str(s),
    }
  }
}

impl From<&str> for AnnotationValue {
  fn from(value: &str) -> Self {
    AnnotationValue::Text(value.to_string())
  }
}

impl From<String> for AnnotationValue {
  fn from(value: String) -> Self {
    AnnotationValue::Text(value)
  }
}

impl From<f64> for AnnotationValue {
  fn from(value: f64) -> Self {
    AnnotationValue::Number(value)
  }
}

impl From<u64> for AnnotationValue {
  fn from(value: u64) -> Self {
    AnnotationValue::Number(value as f64)
  }
}

impl From<bool> for AnnotationValue {
  fn from(value: bool) -> Self {
    AnnotationValue::Bool(value)
  }
}

/// Annotation definition as returned by `GET annotations`.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
  #[serde(rename = "annotationName")]
  pub name: String,
  #[serde(rename = "annotationDisplayName")]
  pub display_name: String,
  #[serde(default)]
  pub description: String,
  #[serde(rename = "type", default)]
  pub annotation_type: AnnotationType,
  #[serde(default)]
  pub units: Option<String>,
}

impl Annotation {
  pub fn new(name: impl Into<String>, display_name: impl Into<String>, annotation_type: AnnotationType) -> Self {
    Self {
      name: name.into(),
      display_name: display_name.into(),
      description: String::new(),
      annotation_type,
      units: None,
    }
  }

  pub fn with_units(mut self, units: impl Into<String>) -> Self {
    self.units = Some(units.into());
    self
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = description.into();
    self
  }

  /// Annotations for the top-level `FileDetail` fields.
  pub fn top_level() -> Vec<Annotation> {
    vec![
      Annotation::new(FILE_NAME, "File name", AnnotationType::Text).with_description("Name of file"),
      Annotation::new(FILE_PATH, "File path", AnnotationType::Text).with_description("Path to file in storage"),
      Annotation::new(FILE_SIZE, "File size", AnnotationType::Number)
        .with_units("bytes")
        .with_description("Size of file on disk"),
      Annotation::new(UPLOADED, "Uploaded", AnnotationType::DateTime).with_description("Date file was uploaded"),
      Annotation::new(FILE_ID, "File ID", AnnotationType::Text).with_description("ID for file"),
      Annotation::new(THUMBNAIL, "Thumbnail", AnnotationType::Text).with_description("Path to thumbnail image"),
    ]
  }

  pub fn is_top_level(name: &str) -> bool {
    matches!(name, FILE_ID | FILE_NAME | FILE_PATH | FILE_SIZE | UPLOADED | THUMBNAIL)
  }

  pub fn extract_from_file(&self, file: &FileDetail) -> Option<Vec<AnnotationValue>> {
    file.values_for(&self.name)
  }

  /// Format this annotation's value(s) on `file` for display, joining multiple values with ", ".
  pub fn display_value(&self, file: &FileDetail) -> Option<String> {
    let values = self.extract_from_file(file)?;
    Some(self.format_values(&values, ", "))
  }

  pub fn format_value(&self, value: &AnnotationValue) -> String {
    self.annotation_type.display_value(value, self.units.as_deref())
  }

  pub fn format_values(&self, values: &[AnnotationValue], separator: &str) -> String {
    values
      .iter()
      .map(|v| self.format_value(v))
      .collect::<Vec<_>>()
      .join(separator)
  }

  /// Parse a user-entered display string into a value of this annotation's type.
  pub fn value_of(&self, raw: &str) -> Result<AnnotationValue, FormatError> {
    self.annotation_type.value_of(raw)
  }
}
