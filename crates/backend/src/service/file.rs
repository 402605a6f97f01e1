//! File queries: counts, pages of file records, and selection aggregates.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::util::{QueryBuilder, ServiceError};
use crate::{
  domain::{
    file::FileDetail,
    filter::{FileQuery, FileSort, Filter, SortOrder},
    range::NumericRange,
  },
  http::HttpClient,
};

/// Inclusive index range as sent to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRange {
  pub start: usize,
  pub end: usize,
}

impl From<NumericRange> for IndexRange {
  fn from(range: NumericRange) -> Self {
    Self {
      start: range.from(),
      end: range.to(),
    }
  }
}

impl TryFrom<IndexRange> for NumericRange {
  type Error = crate::domain::range::RangeError;

  fn try_from(range: IndexRange) -> Result<Self, Self::Error> {
    NumericRange::new(range.start, range.end)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionSort {
  pub annotation_name: String,
  pub ascending: bool,
}

/// Rows selected out of one file set, in the shape the service expects.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
  /// Value filters: annotation name to accepted values
  #[serde(default)]
  pub filters: BTreeMap<String, Vec<String>>,
  #[serde(default)]
  pub include: Vec<String>,
  #[serde(default)]
  pub exclude: Vec<String>,
  #[serde(default)]
  pub fuzzy: Vec<String>,
  pub index_ranges: Vec<IndexRange>,
  #[serde(default)]
  pub sort: Option<SelectionSort>,
}

impl SelectionRequest {
  pub fn new(query: &FileQuery, ranges: impl IntoIterator<Item = NumericRange>) -> Self {
    Self {
      filters: query.value_filters_by_name(),
      include: query.names_where(|f| matches!(f, Filter::Include { .. })),
      exclude: query.names_where(|f| matches!(f, Filter::Exclude { .. })),
      fuzzy: query.names_where(|f| matches!(f, Filter::Fuzzy { .. })),
      index_ranges: NumericRange::compact(ranges).into_iter().map(IndexRange::from).collect(),
      sort: query.sort().map(|sort| SelectionSort {
        annotation_name: sort.annotation_name.clone(),
        ascending: sort.order == SortOrder::Asc,
      }),
    }
  }

  /// The file set this selection was taken from.
  pub fn to_file_query(&self) -> FileQuery {
    let values = self
      .filters
      .iter()
      .flat_map(|(name, values)| values.iter().map(move |v| Filter::value(name.clone(), v.clone())));
    let include = self.include.iter().map(Filter::include);
    let exclude = self.exclude.iter().map(Filter::exclude);
    let fuzzy = self.fuzzy.iter().map(Filter::fuzzy);

    let sort = self.sort.as_ref().map(|s| {
      FileSort::new(
        s.annotation_name.clone(),
        if s.ascending { SortOrder::Asc } else { SortOrder::Desc },
      )
    });
    FileQuery::new(values.chain(include).chain(exclude).chain(fuzzy), sort)
  }

  pub fn ranges(&self) -> Result<Vec<NumericRange>, ServiceError> {
    self
      .index_ranges
      .iter()
      .map(|r| NumericRange::try_from(*r).map_err(ServiceError::from))
      .collect()
  }

  /// Number of rows covered by the index ranges.
  pub fn row_count(&self) -> usize {
    self.index_ranges.iter().map(|r| r.end.saturating_sub(r.start) + 1).sum()
  }
}

/// Totals over a selection, de-duplicated by file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AggregateInfo {
  pub count: usize,
  pub size: u64,
}

#[async_trait]
pub trait FileService: Send + Sync {
  /// Total number of files matching the query.
  async fn count_matching_files(&self, query: &FileQuery) -> Result<usize, ServiceError>;

  /// One page of matching files in query order. Offset is `page * limit`.
  async fn get_files(&self, query: &FileQuery, page: usize, limit: usize) -> Result<Vec<FileDetail>, ServiceError>;

  /// Count and total size of the files covered by the selections.
  async fn get_aggregate_information(&self, selections: &[SelectionRequest]) -> Result<AggregateInfo, ServiceError>;
}

pub struct HttpFileService {
  http: Arc<HttpClient>,
}

impl HttpFileService {
  pub fn new(http: Arc<HttpClient>) -> Self {
    Self { http }
  }
}

#[async_trait]
impl FileService for HttpFileService {
  async fn count_matching_files(&self, query: &FileQuery) -> Result<usize, ServiceError> {
    let path = QueryBuilder::new().add_raw(query.to_query_string()).build_path("files/count");
    let response = self.http.get::<usize>(&path).await?;
    Ok(response.into_first().unwrap_or(0))
  }

  async fn get_files(&self, query: &FileQuery, page: usize, limit: usize) -> Result<Vec<FileDetail>, ServiceError> {
    if limit == 0 {
      return Err(ServiceError::validation("page limit must be greater than zero"));
    }
    let path = QueryBuilder::new()
      .add("from", page)
      .add("limit", limit)
      .add_raw(query.to_query_string())
      .build_path("files");
    let response = self.http.get::<FileDetail>(&path).await?;
    debug!(page, limit, returned = response.data.len(), "Fetched file page");
    Ok(response.data)
  }

  async fn get_aggregate_information(&self, selections: &[SelectionRequest]) -> Result<AggregateInfo, ServiceError> {
    if selections.is_empty() {
      return Ok(AggregateInfo::default());
    }
    let response = self
      .http
      .post::<_, AggregateInfo>("files/selection/aggregate", selections)
      .await?;
    response
      .into_first()
      .ok_or_else(|| ServiceError::internal("aggregate response contained no data"))
  }
}
