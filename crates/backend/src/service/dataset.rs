use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::util::{QueryBuilder, ServiceError};
use crate::{
  domain::dataset::{CreateDatasetRequest, Dataset},
  http::{HttpClient, RestResponse},
};

#[async_trait]
pub trait DatasetService: Send + Sync {
  async fn create_dataset(&self, request: &CreateDatasetRequest) -> Result<Dataset, ServiceError>;

  /// Every dataset visible to the caller. Never served from cache.
  async fn get_datasets(&self) -> Result<Vec<Dataset>, ServiceError>;

  /// A dataset by name; the latest version when `version` is `None`.
  async fn get_dataset(&self, name: &str, version: Option<u32>) -> Result<Dataset, ServiceError>;
}

pub(crate) fn validate_create_request(request: &CreateDatasetRequest) -> Result<(), ServiceError> {
  if request.name.trim().is_empty() {
    return Err(ServiceError::validation("dataset name must not be empty"));
  }
  if request.selections.is_empty() {
    return Err(ServiceError::validation("dataset must select at least one file"));
  }
  Ok(())
}

pub struct HttpDatasetService {
  http: Arc<HttpClient>,
}

impl HttpDatasetService {
  pub fn new(http: Arc<HttpClient>) -> Self {
    Self { http }
  }
}

#[async_trait]
impl DatasetService for HttpDatasetService {
  async fn create_dataset(&self, request: &CreateDatasetRequest) -> Result<Dataset, ServiceError> {
    validate_create_request(request)?;
    let response = self.http.post::<_, Dataset>("dataset", request).await?;
    let dataset = response
      .into_first()
      .ok_or_else(|| ServiceError::internal("dataset creation returned no dataset"))?;
    info!(name = %dataset.name, version = dataset.version, "Created dataset");
    Ok(dataset)
  }

  async fn get_datasets(&self) -> Result<Vec<Dataset>, ServiceError> {
    let body = self.http.get_text("dataset").await?;
    let response: RestResponse<Dataset> = serde_json::from_str(&body).map_err(crate::http::HttpError::from)?;
    Ok(response.data)
  }

  async fn get_dataset(&self, name: &str, version: Option<u32>) -> Result<Dataset, ServiceError> {
    let path = QueryBuilder::new()
      .add_opt("version", version)
      .build_path(&format!("dataset/{}", urlencoding::encode(name)));
    let id = match version {
      Some(v) => format!("{} v{}", name, v),
      None => name.to_string(),
    };

    // Only pinned versions are immutable, so only those go through the cache.
    let response = match version {
      Some(_) => self.http.get::<Dataset>(&path).await,
      None => match self.http.get_text(&path).await {
        Ok(body) => serde_json::from_str::<RestResponse<Dataset>>(&body).map_err(Into::into),
        Err(e) => Err(e),
      },
    }
    .map_err(|e| ServiceError::from_http("dataset", id.clone(), e))?;

    response.into_first().ok_or_else(|| ServiceError::not_found("dataset", id))
  }
}
