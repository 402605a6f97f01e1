//! A query bound to a file service, with its rows cached by index.

use std::{fmt, sync::Arc};

use moka::future::Cache;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::{
  domain::{file::FileDetail, filter::FileQuery, range::NumericRange},
  service::{FileService, ServiceError},
};

/// Page request covering a contiguous index range with a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageParameters {
  pub page: usize,
  pub limit: usize,
}

impl PageParameters {
  /// Smallest page size for which `start` and `end` fall on the same page.
  ///
  /// A range straddling a large boundary can need a page far bigger than itself
  /// (`[99_999, 100_498]` needs 1005 rows). Ranges that stay inside one block of
  /// `n` aligned rows never need more than `n`; [`WindowedFetcher`](super::WindowedFetcher)
  /// splits its batches that way.
  pub fn covering(start: usize, end: usize) -> Self {
    let mut limit = end.saturating_sub(start) + 1;
    while start / limit != end / limit {
      limit += 1;
    }
    Self {
      page: start / limit,
      limit,
    }
  }

  /// Absolute index of the first row on this page.
  pub fn offset(&self) -> usize {
    self.page * self.limit
  }
}

pub struct FileSet {
  query: FileQuery,
  hash: String,
  service: Arc<dyn FileService>,
  cache: Cache<usize, Arc<FileDetail>>,
  total: OnceCell<usize>,
}

impl FileSet {
  pub fn new(query: FileQuery, service: Arc<dyn FileService>, max_cached_files: u64) -> Self {
    Self {
      hash: query.to_query_string(),
      query,
      service,
      cache: Cache::new(max_cached_files),
      total: OnceCell::new(),
    }
  }

  pub fn query(&self) -> &FileQuery {
    &self.query
  }

  /// Identity of the file set: its canonical query string.
  pub fn hash(&self) -> &str {
    &self.hash
  }

  /// Number of files in the set, fetched once.
  pub async fn total_count(&self) -> Result<usize, ServiceError> {
    self
      .total
      .get_or_try_init(|| self.service.count_matching_files(&self.query))
      .await
      .copied()
  }

  pub fn is_file_metadata_loaded(&self, index: usize) -> bool {
    self.cache.contains_key(&index)
  }

  pub async fn cached_file(&self, index: usize) -> Option<Arc<FileDetail>> {
    self.cache.get(&index).await
  }

  /// Fetch rows `start..=end` with a single page request, caching every row the page returns.
  ///
  /// Rows past the end of the set are simply absent from the result.
  #[instrument(level = "debug", skip(self), fields(file_set = %self.hash))]
  pub async fn fetch_file_range(&self, start: usize, end: usize) -> Result<Vec<Arc<FileDetail>>, ServiceError> {
    let range = NumericRange::new(start, end)?;
    let params = PageParameters::covering(range.from(), range.to());
    let files = self.service.get_files(&self.query, params.page, params.limit).await?;
    debug!(page = params.page, limit = params.limit, returned = files.len(), "Fetched file range");

    let offset = params.offset();
    let mut requested = Vec::with_capacity(range.length());
    for (i, file) in files.into_iter().enumerate() {
      let index = offset + i;
      let file = Arc::new(file);
      self.cache.insert(index, file.clone()).await;
      if range.contains(index) {
        requested.push(file);
      }
    }
    Ok(requested)
  }
}

impl PartialEq for FileSet {
  fn eq(&self, other: &Self) -> bool {
    self.hash == other.hash
  }
}

impl Eq for FileSet {}

impl fmt::Debug for FileSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FileSet")
      .field("hash", &self.hash)
      .field("total", &self.total.get())
      .finish()
  }
}
