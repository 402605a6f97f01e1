//! Tests for the in-memory services.
//!
//! These double as a check of the query semantics the HTTP service is expected
//! to implement: paging, sorting, aggregation and hierarchy lookups.

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::{
    domain::{
      annotation::{AnnotationType, AnnotationValue, FILE_NAME},
      dataset::CreateDatasetRequest,
      filter::{FileQuery, FileSort, Filter, SortOrder},
      range::NumericRange,
    },
    service::{
      __tests__::helpers::sample_files,
      AnnotationService, DatasetService, FileService, LocalFileService, SelectionRequest, ServiceError,
    },
  };

  fn service() -> LocalFileService {
    LocalFileService::new(sample_files(12))
  }

  fn r(from: usize, to: usize) -> NumericRange {
    NumericRange::new(from, to).unwrap()
  }

  #[tokio::test]
  async fn test_count_matching_files() {
    let service = service();
    assert_eq!(service.count_matching_files(&FileQuery::default()).await.unwrap(), 12);

    let query = FileQuery::new(vec![Filter::value("Cell line", "AICS-10")], None);
    assert_eq!(service.count_matching_files(&query).await.unwrap(), 6);

    let query = FileQuery::new(vec![Filter::include("Dye")], None);
    assert_eq!(service.count_matching_files(&query).await.unwrap(), 3);
  }

  #[tokio::test]
  async fn test_pages_follow_sort_order() {
    let service = service();
    let query = FileQuery::new(vec![], Some(FileSort::default()));

    let first = service.get_files(&query, 0, 5).await.unwrap();
    let ids: Vec<_> = first.iter().map(|f| f.file_id.as_str()).collect();
    assert_eq!(ids, vec!["f011", "f010", "f009", "f008", "f007"]);

    let last = service.get_files(&query, 2, 5).await.unwrap();
    let ids: Vec<_> = last.iter().map(|f| f.file_id.as_str()).collect();
    assert_eq!(ids, vec!["f001", "f000"]);

    assert!(service.get_files(&query, 3, 5).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_zero_limit_is_rejected() {
    let err = service().get_files(&FileQuery::default(), 0, 0).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
  }

  #[tokio::test]
  async fn test_aggregate_deduplicates_files() {
    let service = service();
    let query = FileQuery::new(vec![], Some(FileSort::new(FILE_NAME, SortOrder::Asc)));
    let selections = vec![
      SelectionRequest::new(&query, vec![r(0, 2)]),
      SelectionRequest::new(&query, vec![r(1, 3)]),
    ];

    let info = service.get_aggregate_information(&selections).await.unwrap();
    assert_eq!(info.count, 4);
    assert_eq!(info.size, 1000 + 2000 + 3000 + 4000);
  }

  #[tokio::test]
  async fn test_inferred_annotations() {
    let annotations = service().fetch_annotations().await.unwrap();
    let objective = annotations.iter().find(|a| a.name == "Objective").unwrap();
    assert_eq!(objective.annotation_type, AnnotationType::Number);
    let gene = annotations.iter().find(|a| a.name == "Gene").unwrap();
    assert_eq!(gene.annotation_type, AnnotationType::Text);
    assert!(annotations.iter().any(|a| a.name == FILE_NAME));
  }

  #[tokio::test]
  async fn test_fetch_values() {
    let service = service();
    let values = service.fetch_values("Objective").await.unwrap();
    assert_eq!(values, vec![AnnotationValue::Number(63.0), AnnotationValue::Number(100.0)]);

    let err = service.fetch_values("Nope").await.unwrap_err();
    assert!(err.is_not_found());
  }

  #[tokio::test]
  async fn test_hierarchy_values() {
    let service = service();
    let hierarchy = vec!["Cell line".to_string(), "Gene".to_string()];

    let root = service.fetch_root_hierarchy_values(&hierarchy, &[]).await.unwrap();
    assert_eq!(root, vec![AnnotationValue::from("AICS-10"), AnnotationValue::from("AICS-12")]);

    let under = service
      .fetch_hierarchy_values_under_path(&hierarchy, &["AICS-10".to_string()], &[Filter::value("Objective", "100")])
      .await
      .unwrap();
    // Even files below 6: f000 (LMNB1), f002 (SEC61B), f004 (TOMM20)
    let expected: Vec<AnnotationValue> = vec!["LMNB1".into(), "SEC61B".into(), "TOMM20".into()];
    assert_eq!(under, expected);

    let too_deep = service
      .fetch_hierarchy_values_under_path(&hierarchy, &["AICS-10".to_string(), "LMNB1".to_string()], &[])
      .await;
    assert!(matches!(too_deep, Err(ServiceError::Validation(_))));
  }

  #[tokio::test]
  async fn test_available_annotations_for_hierarchy() {
    let available = service()
      .fetch_available_annotations_for_hierarchy(&["Dye".to_string()])
      .await
      .unwrap();
    assert_eq!(available, vec!["Cell line", "Dye", "Gene", "Objective"]);
  }

  #[tokio::test]
  async fn test_local_datasets_are_versioned() {
    let service = service();
    let selection = SelectionRequest::new(&FileQuery::default(), vec![r(0, 3)]);
    let request = CreateDatasetRequest::new("my set", vec!["Gene".to_string()], vec![selection]);

    let v1 = service.create_dataset(&request).await.unwrap();
    let v2 = service.create_dataset(&request).await.unwrap();
    assert_eq!((v1.version, v2.version), (1, 2));

    assert_eq!(service.get_dataset("my set", None).await.unwrap().version, 2);
    assert_eq!(service.get_dataset("my set", Some(1)).await.unwrap().id, v1.id);
    assert!(service.get_dataset("other", None).await.unwrap_err().is_not_found());
    assert_eq!(service.get_datasets().await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn test_dataset_requires_selection() {
    let request = CreateDatasetRequest::new("empty", vec![], vec![]);
    let err = service().create_dataset(&request).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
  }

  #[tokio::test]
  async fn test_from_json_file_accepts_both_shapes() {
    let temp = tempfile::TempDir::new().unwrap();
    let files = sample_files(3);

    let list = temp.path().join("list.json");
    std::fs::write(&list, serde_json::to_string(&files).unwrap()).unwrap();
    assert_eq!(LocalFileService::from_json_file(&list).unwrap().files().len(), 3);

    let document = temp.path().join("doc.json");
    let json = serde_json::json!({
      "files": files,
      "annotations": [{"annotationName": "Gene", "annotationDisplayName": "Gene name", "type": "Lookup"}]
    });
    std::fs::write(&document, json.to_string()).unwrap();
    let service = LocalFileService::from_json_file(&document).unwrap();
    let annotations = service.fetch_annotations().await.unwrap();
    let gene = annotations.iter().find(|a| a.name == "Gene").unwrap();
    assert_eq!(gene.display_name, "Gene name");

    let missing = LocalFileService::from_json_file(&temp.path().join("missing.json"));
    assert!(matches!(missing, Err(ServiceError::Io(_))));
  }
}
