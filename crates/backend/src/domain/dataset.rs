//! Datasets: named, versioned snapshots of a file selection.

use serde::{Deserialize, Serialize};

use crate::service::SelectionRequest;

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
  pub id: String,
  pub name: String,
  pub version: u32,
  #[serde(default)]
  pub created: Option<String>,
  #[serde(default)]
  pub created_by: Option<String>,
  #[serde(default)]
  pub expiration: Option<String>,
  /// Annotation names captured as columns of the dataset
  #[serde(default)]
  pub annotations: Vec<String>,
  /// Fixed datasets snapshot the matching files; non-fixed ones re-evaluate their query
  #[serde(default)]
  pub fixed: bool,
  #[serde(default)]
  pub private: bool,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDatasetRequest {
  pub name: String,
  pub annotations: Vec<String>,
  pub expiration: Option<String>,
  pub selections: Vec<SelectionRequest>,
  pub fixed: bool,
  pub private: bool,
}

impl CreateDatasetRequest {
  pub fn new(name: impl Into<String>, annotations: Vec<String>, selections: Vec<SelectionRequest>) -> Self {
    Self {
      name: name.into(),
      annotations,
      expiration: None,
      selections,
      fixed: true,
      private: true,
    }
  }
}

/// Python code for loading a dataset programmatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PythonSnippet {
  /// Shell command installing the client library
  pub setup: String,
  pub code: String,
}

impl PythonSnippet {
  pub fn for_dataset(dataset: &Dataset) -> Self {
    let code = format!(
      "from aicsfiles import FileManagementSystem\n\
       \n\
       fms = FileManagementSystem()\n\
       df = fms.datasets.get_metadata_for_dataset(name={}, version={})\n",
      python_string(&dataset.name),
      dataset.version
    );
    Self {
      setup: "pip install aicsfiles".to_string(),
      code,
    }
  }
}

/// Double-quoted Python string literal.
fn python_string(value: &str) -> String {
  let mut out = String::with_capacity(value.len() + 2);
  out.push('"');
  for c in value.chars() {
    match c {
      '\\' => out.push_str("\\\\"),
      '"' => out.push_str("\\\""),
      '\n' => out.push_str("\\n"),
      '\r' => out.push_str("\\r"),
      '\t' => out.push_str("\\t"),
      c => out.push(c),
    }
  }
  out.push('"');
  out
}
