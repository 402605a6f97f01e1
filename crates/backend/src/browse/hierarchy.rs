//! Grouping files into folders by an ordered list of annotations.

use tracing::debug;

use crate::{
  domain::{
    annotation::AnnotationValue,
    filter::{FileQuery, FileSort, Filter},
  },
  service::{AnnotationService, FileService, ServiceError},
};

/// One folder of a grouped view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
  /// Values from the root down to and including this folder
  pub path: Vec<String>,
  pub value: AnnotationValue,
  pub file_count: usize,
  pub children: Vec<FolderNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnnotationHierarchy {
  annotations: Vec<String>,
  filters: Vec<Filter>,
}

impl AnnotationHierarchy {
  pub fn new(annotations: impl IntoIterator<Item = impl Into<String>>, filters: impl IntoIterator<Item = Filter>) -> Self {
    Self {
      annotations: annotations.into_iter().map(Into::into).collect(),
      filters: filters.into_iter().collect(),
    }
  }

  pub fn annotations(&self) -> &[String] {
    &self.annotations
  }

  pub fn filters(&self) -> &[Filter] {
    &self.filters
  }

  pub fn depth(&self) -> usize {
    self.annotations.len()
  }

  /// Folder values one level below `path`. Empty at leaf depth.
  pub async fn children(
    &self,
    service: &dyn AnnotationService,
    path: &[String],
  ) -> Result<Vec<AnnotationValue>, ServiceError> {
    if path.len() >= self.depth() {
      return Ok(Vec::new());
    }
    if path.is_empty() {
      service.fetch_root_hierarchy_values(&self.annotations, &self.filters).await
    } else {
      service
        .fetch_hierarchy_values_under_path(&self.annotations, path, &self.filters)
        .await
    }
  }

  /// Query for the files inside the folder at `path`.
  pub fn file_query(&self, path: &[String], sort: Option<FileSort>) -> Result<FileQuery, ServiceError> {
    if path.len() > self.depth() {
      return Err(ServiceError::validation(format!(
        "path of depth {} is deeper than the hierarchy ({})",
        path.len(),
        self.depth()
      )));
    }
    let path_filters = self
      .annotations
      .iter()
      .zip(path)
      .map(|(name, value)| Filter::value(name.clone(), value.clone()));
    Ok(FileQuery::new(self.filters.iter().cloned().chain(path_filters), sort))
  }

  /// Expand the hierarchy into folders with file counts, down to `max_depth` levels.
  pub async fn build_tree(
    &self,
    annotations: &dyn AnnotationService,
    files: &dyn FileService,
    max_depth: Option<usize>,
  ) -> Result<Vec<FolderNode>, ServiceError> {
    let max_depth = max_depth.unwrap_or(self.depth()).min(self.depth());
    self.build_level(annotations, files, Vec::new(), max_depth).await
  }

  async fn build_level(
    &self,
    annotations: &dyn AnnotationService,
    files: &dyn FileService,
    path: Vec<String>,
    max_depth: usize,
  ) -> Result<Vec<FolderNode>, ServiceError> {
    if path.len() >= max_depth {
      return Ok(Vec::new());
    }

    let values = self.children(annotations, &path).await?;
    debug!(depth = path.len(), folders = values.len(), "Expanding hierarchy level");

    let mut nodes = Vec::with_capacity(values.len());
    for value in values {
      let mut folder_path = path.clone();
      folder_path.push(value.to_string());

      let file_count = files.count_matching_files(&self.file_query(&folder_path, None)?).await?;
      let children = Box::pin(self.build_level(annotations, files, folder_path.clone(), max_depth)).await?;
      nodes.push(FolderNode {
        path: folder_path,
        value,
        file_count,
        children,
      });
    }
    Ok(nodes)
  }
}
