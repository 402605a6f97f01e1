use serde::{Deserialize, Serialize};

use super::annotation::{AnnotationValue, FILE_ID, FILE_NAME, FILE_PATH, FILE_SIZE, THUMBNAIL, UPLOADED};

/// One annotation name with all of its values on a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnnotation {
  pub name: String,
  #[serde(default)]
  pub values: Vec<AnnotationValue>,
}

/// A file record as returned by the metadata service.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDetail {
  pub file_id: String,
  pub file_name: String,
  pub file_path: String,
  #[serde(default)]
  pub file_size: Option<u64>,
  #[serde(default)]
  pub uploaded: Option<String>,
  #[serde(default)]
  pub thumbnail: Option<String>,
  #[serde(default)]
  pub annotations: Vec<FileAnnotation>,
}

impl FileDetail {
  pub fn annotation(&self, name: &str) -> Option<&FileAnnotation> {
    self.annotations.iter().find(|a| a.name == name)
  }

  pub fn first_annotation_value(&self, name: &str) -> Option<&AnnotationValue> {
    self.annotation(name).and_then(|a| a.values.first())
  }

  /// Values for `name`, treating the top-level fields (`file_name`, `file_size`, ...)
  /// as annotations. Returns `None` when the file has no value for it.
  pub fn values_for(&self, name: &str) -> Option<Vec<AnnotationValue>> {
    let top_level = match name {
      FILE_ID => Some(AnnotationValue::from(self.file_id.as_str())),
      FILE_NAME => Some(AnnotationValue::from(self.file_name.as_str())),
      FILE_PATH => Some(AnnotationValue::from(self.file_path.as_str())),
      FILE_SIZE => return self.file_size.map(|size| vec![size.into()]),
      UPLOADED => return self.uploaded.as_deref().map(|u| vec![u.into()]),
      THUMBNAIL => return self.thumbnail.as_deref().map(|t| vec![t.into()]),
      _ => None,
    };
    if let Some(value) = top_level {
      return Some(vec![value]);
    }

    self
      .annotation(name)
      .filter(|a| !a.values.is_empty())
      .map(|a| a.values.clone())
  }

  pub fn has_value_for(&self, name: &str) -> bool {
    self.values_for(name).is_some()
  }

  /// Names of the custom (non top-level) annotations carrying at least one value.
  pub fn annotation_names(&self) -> impl Iterator<Item = &str> {
    self
      .annotations
      .iter()
      .filter(|a| !a.values.is_empty())
      .map(|a| a.name.as_str())
  }
}
