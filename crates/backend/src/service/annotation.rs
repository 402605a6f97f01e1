//! Annotation definitions, values, and hierarchy (grouping) lookups.

use std::{collections::HashSet, sync::Arc};

use async_trait::async_trait;

use super::util::{QueryBuilder, ServiceError};
use crate::{
  domain::{
    annotation::{Annotation, AnnotationValue},
    filter::{FileQuery, Filter},
  },
  http::HttpClient,
};

#[async_trait]
pub trait AnnotationService: Send + Sync {
  /// Every annotation, top-level file fields first.
  async fn fetch_annotations(&self) -> Result<Vec<Annotation>, ServiceError>;

  /// Distinct values of one annotation.
  async fn fetch_values(&self, annotation: &str) -> Result<Vec<AnnotationValue>, ServiceError>;

  /// Values of the first hierarchy annotation among files matching `filters`.
  async fn fetch_root_hierarchy_values(
    &self,
    hierarchy: &[String],
    filters: &[Filter],
  ) -> Result<Vec<AnnotationValue>, ServiceError>;

  /// Values of `hierarchy[path.len()]` among matching files whose first `path.len()`
  /// hierarchy annotations equal `path`.
  async fn fetch_hierarchy_values_under_path(
    &self,
    hierarchy: &[String],
    path: &[String],
    filters: &[Filter],
  ) -> Result<Vec<AnnotationValue>, ServiceError>;

  /// Names of annotations that co-occur with every annotation of the hierarchy.
  async fn fetch_available_annotations_for_hierarchy(&self, hierarchy: &[String]) -> Result<Vec<String>, ServiceError>;
}

pub struct HttpAnnotationService {
  http: Arc<HttpClient>,
}

impl HttpAnnotationService {
  pub fn new(http: Arc<HttpClient>) -> Self {
    Self { http }
  }
}

fn filter_query(filters: &[Filter]) -> String {
  FileQuery::new(filters.iter().cloned(), None).to_query_string()
}

#[async_trait]
impl AnnotationService for HttpAnnotationService {
  async fn fetch_annotations(&self) -> Result<Vec<Annotation>, ServiceError> {
    let response = self.http.get::<Annotation>("annotations").await?;
    let mut annotations = Annotation::top_level();
    let seen: HashSet<String> = annotations.iter().map(|a| a.name.clone()).collect();
    annotations.extend(response.data.into_iter().filter(|a| !seen.contains(&a.name)));
    Ok(annotations)
  }

  async fn fetch_values(&self, annotation: &str) -> Result<Vec<AnnotationValue>, ServiceError> {
    let path = format!("annotations/{}/values", urlencoding::encode(annotation));
    let response = self
      .http
      .get::<AnnotationValue>(&path)
      .await
      .map_err(|e| ServiceError::from_http("annotation", annotation, e))?;
    Ok(response.data)
  }

  async fn fetch_root_hierarchy_values(
    &self,
    hierarchy: &[String],
    filters: &[Filter],
  ) -> Result<Vec<AnnotationValue>, ServiceError> {
    if hierarchy.is_empty() {
      return Err(ServiceError::validation("hierarchy must name at least one annotation"));
    }
    let path = QueryBuilder::new()
      .add_all("order", hierarchy)
      .add_raw(filter_query(filters))
      .build_path("annotations/hierarchy/root");
    Ok(self.http.get::<AnnotationValue>(&path).await?.data)
  }

  async fn fetch_hierarchy_values_under_path(
    &self,
    hierarchy: &[String],
    path: &[String],
    filters: &[Filter],
  ) -> Result<Vec<AnnotationValue>, ServiceError> {
    if path.len() >= hierarchy.len() {
      return Err(ServiceError::validation(format!(
        "path of depth {} has no children in a hierarchy of depth {}",
        path.len(),
        hierarchy.len()
      )));
    }
    let request = QueryBuilder::new()
      .add_all("order", hierarchy)
      .add_all("path", path)
      .add_raw(filter_query(filters))
      .build_path("annotations/hierarchy/under-path");
    Ok(self.http.get::<AnnotationValue>(&request).await?.data)
  }

  async fn fetch_available_annotations_for_hierarchy(&self, hierarchy: &[String]) -> Result<Vec<String>, ServiceError> {
    let path = QueryBuilder::new()
      .add_all("hierarchy", hierarchy)
      .build_path("annotations/hierarchy/available");
    Ok(self.http.get::<String>(&path).await?.data)
  }
}
