//! In-memory services over a fixed list of files.
//!
//! Backs offline browsing of a JSON export and the tests of everything above the
//! service layer. Filtering and sorting go through [`FileQuery::matches`] and
//! [`FileQuery::compare`], so results line up with what the HTTP service returns.

use std::{
  collections::{BTreeMap, BTreeSet, HashSet},
  path::Path,
};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{
  annotation::AnnotationService,
  dataset::{DatasetService, validate_create_request},
  file::{AggregateInfo, FileService, SelectionRequest},
  util::ServiceError,
};
use crate::domain::{
  annotation::{Annotation, AnnotationType, AnnotationValue},
  dataset::{CreateDatasetRequest, Dataset},
  file::FileDetail,
  filter::{FileQuery, Filter},
};

#[derive(Deserialize)]
#[serde(untagged)]
enum SourceDocument {
  Files(Vec<FileDetail>),
  Document {
    files: Vec<FileDetail>,
    #[serde(default)]
    annotations: Vec<Annotation>,
  },
}

pub struct LocalFileService {
  files: Vec<FileDetail>,
  annotations: Vec<Annotation>,
  datasets: Mutex<Vec<Dataset>>,
}

impl LocalFileService {
  /// Annotation definitions are inferred from the values present on the files.
  pub fn new(files: Vec<FileDetail>) -> Self {
    let annotations = infer_annotations(&files);
    Self {
      files,
      annotations,
      datasets: Mutex::new(Vec::new()),
    }
  }

  /// Use explicit annotation definitions; top-level file fields are always included.
  pub fn with_annotations(files: Vec<FileDetail>, annotations: Vec<Annotation>) -> Self {
    let mut all = Annotation::top_level();
    let seen: HashSet<String> = all.iter().map(|a| a.name.clone()).collect();
    all.extend(annotations.into_iter().filter(|a| !seen.contains(&a.name)));
    Self {
      files,
      annotations: all,
      datasets: Mutex::new(Vec::new()),
    }
  }

  /// Load either a JSON array of files or `{"files": [...], "annotations": [...]}`.
  pub fn from_json_file(path: &Path) -> Result<Self, ServiceError> {
    let content = std::fs::read_to_string(path)?;
    let document: SourceDocument = serde_json::from_str(&content)
      .map_err(|e| ServiceError::validation(format!("{} is not a file list: {}", path.display(), e)))?;

    let service = match document {
      SourceDocument::Files(files) => Self::new(files),
      SourceDocument::Document { files, annotations } if annotations.is_empty() => Self::new(files),
      SourceDocument::Document { files, annotations } => Self::with_annotations(files, annotations),
    };
    info!(path = %path.display(), files = service.files.len(), "Loaded local file source");
    Ok(service)
  }

  pub fn files(&self) -> &[FileDetail] {
    &self.files
  }

  /// Matching files in query order.
  pub fn matching(&self, query: &FileQuery) -> Vec<&FileDetail> {
    let mut matching: Vec<&FileDetail> = self.files.iter().filter(|f| query.matches(f)).collect();
    matching.sort_by(|a, b| query.compare(a, b));
    matching
  }

  fn distinct_values<'a>(files: impl Iterator<Item = &'a FileDetail>, annotation: &str) -> Vec<AnnotationValue> {
    let values: BTreeSet<AnnotationValue> = files
      .filter_map(|f| f.values_for(annotation))
      .flatten()
      .collect();
    values.into_iter().collect()
  }
}

fn infer_annotations(files: &[FileDetail]) -> Vec<Annotation> {
  let mut values_by_name: BTreeMap<&str, Vec<&AnnotationValue>> = BTreeMap::new();
  for file in files {
    for annotation in &file.annotations {
      values_by_name
        .entry(annotation.name.as_str())
        .or_default()
        .extend(annotation.values.iter());
    }
  }

  let mut annotations = Annotation::top_level();
  for (name, values) in values_by_name {
    if Annotation::is_top_level(name) {
      continue;
    }
    let annotation_type = if !values.is_empty() && values.iter().all(|v| matches!(v, AnnotationValue::Number(_))) {
      AnnotationType::Number
    } else if !values.is_empty() && values.iter().all(|v| matches!(v, AnnotationValue::Bool(_))) {
      AnnotationType::Boolean
    } else {
      AnnotationType::Text
    };
    annotations.push(Annotation::new(name, name, annotation_type));
  }
  annotations
}

#[async_trait]
impl FileService for LocalFileService {
  async fn count_matching_files(&self, query: &FileQuery) -> Result<usize, ServiceError> {
    Ok(self.files.iter().filter(|f| query.matches(f)).count())
  }

  async fn get_files(&self, query: &FileQuery, page: usize, limit: usize) -> Result<Vec<FileDetail>, ServiceError> {
    if limit == 0 {
      return Err(ServiceError::validation("page limit must be greater than zero"));
    }
    Ok(
      self
        .matching(query)
        .into_iter()
        .skip(page.saturating_mul(limit))
        .take(limit)
        .cloned()
        .collect(),
    )
  }

  async fn get_aggregate_information(&self, selections: &[SelectionRequest]) -> Result<AggregateInfo, ServiceError> {
    let mut seen = HashSet::new();
    let mut info = AggregateInfo::default();

    for selection in selections {
      let matching = self.matching(&selection.to_file_query());
      for range in selection.ranges()? {
        for file in range.iter().filter_map(|i| matching.get(i)) {
          if seen.insert(file.file_id.as_str()) {
            info.count += 1;
            info.size += file.file_size.unwrap_or(0);
          }
        }
      }
    }
    Ok(info)
  }
}

#[async_trait]
impl AnnotationService for LocalFileService {
  async fn fetch_annotations(&self) -> Result<Vec<Annotation>, ServiceError> {
    Ok(self.annotations.clone())
  }

  async fn fetch_values(&self, annotation: &str) -> Result<Vec<AnnotationValue>, ServiceError> {
    if !self.annotations.iter().any(|a| a.name == annotation) {
      return Err(ServiceError::not_found("annotation", annotation));
    }
    Ok(Self::distinct_values(self.files.iter(), annotation))
  }

  async fn fetch_root_hierarchy_values(
    &self,
    hierarchy: &[String],
    filters: &[Filter],
  ) -> Result<Vec<AnnotationValue>, ServiceError> {
    self.fetch_hierarchy_values_under_path(hierarchy, &[], filters).await
  }

  async fn fetch_hierarchy_values_under_path(
    &self,
    hierarchy: &[String],
    path: &[String],
    filters: &[Filter],
  ) -> Result<Vec<AnnotationValue>, ServiceError> {
    let Some(next) = hierarchy.get(path.len()) else {
      return Err(ServiceError::validation(format!(
        "path of depth {} has no children in a hierarchy of depth {}",
        path.len(),
        hierarchy.len()
      )));
    };

    let path_filters = hierarchy
      .iter()
      .zip(path)
      .map(|(name, value)| Filter::value(name.clone(), value.clone()));
    let query = FileQuery::new(filters.iter().cloned().chain(path_filters), None);
    debug!(query = %query.to_query_string(), annotation = %next, "Resolving hierarchy level");

    Ok(Self::distinct_values(
      self.files.iter().filter(|f| query.matches(f)),
      next,
    ))
  }

  async fn fetch_available_annotations_for_hierarchy(&self, hierarchy: &[String]) -> Result<Vec<String>, ServiceError> {
    let mut available = BTreeSet::new();
    for file in self.files.iter().filter(|f| hierarchy.iter().all(|h| f.has_value_for(h))) {
      available.extend(file.annotation_names().map(str::to_string));
    }
    Ok(available.into_iter().collect())
  }
}

#[async_trait]
impl DatasetService for LocalFileService {
  async fn create_dataset(&self, request: &CreateDatasetRequest) -> Result<Dataset, ServiceError> {
    validate_create_request(request)?;
    let mut datasets = self.datasets.lock().await;
    let version = datasets
      .iter()
      .filter(|d| d.name == request.name)
      .map(|d| d.version)
      .max()
      .unwrap_or(0)
      + 1;

    let dataset = Dataset {
      id: format!("local-{}-{}", datasets.len() + 1, version),
      name: request.name.clone(),
      version,
      created: Some(chrono::Utc::now().to_rfc3339()),
      created_by: None,
      expiration: request.expiration.clone(),
      annotations: request.annotations.clone(),
      fixed: request.fixed,
      private: request.private,
    };
    datasets.push(dataset.clone());
    Ok(dataset)
  }

  async fn get_datasets(&self) -> Result<Vec<Dataset>, ServiceError> {
    Ok(self.datasets.lock().await.clone())
  }

  async fn get_dataset(&self, name: &str, version: Option<u32>) -> Result<Dataset, ServiceError> {
    let datasets = self.datasets.lock().await;
    datasets
      .iter()
      .filter(|d| d.name == name && version.is_none_or(|v| d.version == v))
      .max_by_key(|d| d.version)
      .cloned()
      .ok_or_else(|| ServiceError::not_found("dataset", name))
  }
}
