//! Lazy loading of the rows a scrolling list is about to show.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Semaphore, watch};
use tracing::{debug, warn};

use super::file_set::FileSet;
use crate::{
  domain::{config::FetchConfig, file::FileDetail, range::NumericRange},
  service::ServiceError,
};

/// Rows to load for a list viewport, padded by `overscan` on both sides and clamped to the set.
pub fn visible_window(first_visible: usize, visible_count: usize, overscan: usize, total: usize) -> Option<NumericRange> {
  if total == 0 || visible_count == 0 || first_visible >= total {
    return None;
  }
  let start = first_visible.saturating_sub(overscan);
  let end = first_visible
    .saturating_add(visible_count - 1)
    .saturating_add(overscan)
    .min(total - 1);
  NumericRange::new(start, end).ok()
}

/// Split `range` at multiples of `size`, so every batch lies inside one page of `size` rows.
fn aligned_batches(range: NumericRange, size: usize) -> Vec<NumericRange> {
  let size = size.max(1);
  let mut batches = Vec::new();
  let mut start = range.from();
  loop {
    let block_end = (start / size).saturating_mul(size).saturating_add(size - 1);
    let end = block_end.min(range.to());
    batches.push(NumericRange::single(start).expand_to(end));
    if end == range.to() {
      return batches;
    }
    start = end + 1;
  }
}

/// A batch being fetched. Dropping it wakes everyone waiting on the batch.
struct InFlight {
  range: NumericRange,
  done: watch::Sender<()>,
}

/// Batches claimed by one load, released when the load finishes or is dropped.
struct Claims<'a> {
  in_flight: &'a Mutex<Vec<InFlight>>,
  batches: Vec<NumericRange>,
}

impl Drop for Claims<'_> {
  fn drop(&mut self) {
    lock(self.in_flight).retain(|f| !self.batches.contains(&f.range));
  }
}

fn lock(in_flight: &Mutex<Vec<InFlight>>) -> MutexGuard<'_, Vec<InFlight>> {
  in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct WindowedFetcher {
  file_set: Arc<FileSet>,
  in_flight: Mutex<Vec<InFlight>>,
  permits: Semaphore,
  max_batch: usize,
}

impl WindowedFetcher {
  pub fn new(file_set: Arc<FileSet>, max_batch: usize, max_concurrent: usize) -> Self {
    Self {
      file_set,
      in_flight: Mutex::new(Vec::new()),
      permits: Semaphore::new(max_concurrent.max(1)),
      max_batch: max_batch.max(1),
    }
  }

  pub fn from_config(file_set: Arc<FileSet>, config: &FetchConfig) -> Self {
    Self::new(file_set, config.max_batch_size, config.max_concurrent_fetches)
  }

  pub fn file_set(&self) -> &Arc<FileSet> {
    &self.file_set
  }

  pub fn is_item_loaded(&self, index: usize) -> bool {
    self.file_set.is_file_metadata_loaded(index)
  }

  /// Load every row in `start..=stop` that is not cached yet.
  ///
  /// Rows nobody is fetching are claimed and fetched in batches aligned to
  /// `max_batch`; rows another call is already fetching are waited for. Returns
  /// the number of rows this call fetched, or the first batch error. Claims are
  /// released whether the batches succeeded or not.
  pub async fn load_more_items(&self, start: usize, stop: usize) -> Result<usize, ServiceError> {
    let total = self.file_set.total_count().await?;
    if total == 0 || start >= total {
      return Ok(0);
    }
    let window = NumericRange::new(start, stop.min(total - 1))?;

    let (claims, pending) = {
      let mut in_flight = lock(&self.in_flight);
      let mut missing = Vec::new();
      let mut waiting_on: Vec<NumericRange> = Vec::new();
      let mut pending = Vec::new();
      for index in window.iter() {
        if self.is_item_loaded(index) {
          continue;
        }
        match in_flight.iter().find(|f| f.range.contains(index)) {
          Some(batch) if !waiting_on.contains(&batch.range) => {
            waiting_on.push(batch.range);
            pending.push(batch.done.subscribe());
          }
          Some(_) => {}
          None => missing.push(NumericRange::single(index)),
        }
      }

      let batches: Vec<NumericRange> = NumericRange::compact(missing)
        .into_iter()
        .flat_map(|range| aligned_batches(range, self.max_batch))
        .collect();
      in_flight.extend(batches.iter().map(|&range| InFlight {
        range,
        done: watch::channel(()).0,
      }));
      (
        Claims {
          in_flight: &self.in_flight,
          batches,
        },
        pending,
      )
    };
    if claims.batches.is_empty() && pending.is_empty() {
      return Ok(0);
    }
    debug!(window = %window, batches = claims.batches.len(), waiting = pending.len(), "Loading rows");

    let batches = claims.batches.clone();
    // Claims go as soon as this call's own batches settle, not after its waits
    let own = async move {
      let results = futures::future::join_all(claims.batches.iter().map(|batch| self.fetch_batch(*batch))).await;
      drop(claims);
      results
    };
    // A batch owned by another call is done once its sender is dropped
    let waits = futures::future::join_all(pending.into_iter().map(|mut done| async move {
      let _ = done.changed().await;
    }));
    let (results, _) = futures::future::join(own, waits).await;

    let mut loaded = 0;
    let mut first_error = None;
    for (batch, result) in batches.iter().zip(results) {
      match result {
        Ok(rows) => loaded += rows.len(),
        Err(e) => {
          warn!(batch = %batch, error = %e, "Failed to load rows");
          if first_error.is_none() {
            first_error = Some(e);
          }
        }
      }
    }
    match first_error {
      Some(e) => Err(e),
      None => Ok(loaded),
    }
  }

  async fn fetch_batch(&self, batch: NumericRange) -> Result<Vec<Arc<FileDetail>>, ServiceError> {
    let _permit = self
      .permits
      .acquire()
      .await
      .map_err(|_| ServiceError::internal("fetch semaphore closed"))?;
    self.file_set.fetch_file_range(batch.from(), batch.to()).await
  }

  /// Rows `start..=stop`, loading what is missing first. Indices past the end are `None`.
  ///
  /// Rows another call was fetching are awaited; if that fetch failed they are
  /// requested once more here so the error surfaces to this caller too.
  pub async fn rows(&self, start: usize, stop: usize) -> Result<Vec<Option<Arc<FileDetail>>>, ServiceError> {
    self.load_more_items(start, stop).await?;
    let total = self.file_set.total_count().await?;
    let last = stop.min(total.saturating_sub(1));
    if start < total && (start..=last).any(|i| !self.is_item_loaded(i)) {
      self.load_more_items(start, stop).await?;
    }

    let mut rows = Vec::with_capacity(stop.saturating_sub(start) + 1);
    for index in start..=stop {
      rows.push(self.file_set.cached_file(index).await);
    }
    Ok(rows)
  }

  /// Number of batches currently being fetched.
  pub fn in_flight(&self) -> usize {
    lock(&self.in_flight).len()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use async_trait::async_trait;
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::{
    domain::filter::{FileQuery, FileSort, SortOrder},
    service::{AggregateInfo, FileService, LocalFileService, SelectionRequest, __tests__::helpers::sample_files},
  };

  /// Fails the first `failures` page requests, then serves from a local service.
  struct FlakyService {
    inner: LocalFileService,
    failures: AtomicUsize,
    pages: AtomicUsize,
  }

  #[async_trait]
  impl FileService for FlakyService {
    async fn count_matching_files(&self, query: &FileQuery) -> Result<usize, ServiceError> {
      self.inner.count_matching_files(query).await
    }

    async fn get_files(&self, query: &FileQuery, page: usize, limit: usize) -> Result<Vec<FileDetail>, ServiceError> {
      self.pages.fetch_add(1, Ordering::SeqCst);
      let remaining = self.failures.load(Ordering::SeqCst);
      if remaining > 0 {
        self.failures.store(remaining - 1, Ordering::SeqCst);
        return Err(ServiceError::internal("service unavailable"));
      }
      self.inner.get_files(query, page, limit).await
    }

    async fn get_aggregate_information(&self, selections: &[SelectionRequest]) -> Result<AggregateInfo, ServiceError> {
      self.inner.get_aggregate_information(selections).await
    }
  }

  fn flaky(count: usize, failures: usize) -> Arc<FlakyService> {
    Arc::new(FlakyService {
      inner: LocalFileService::new(sample_files(count)),
      failures: AtomicUsize::new(failures),
      pages: AtomicUsize::new(0),
    })
  }

  fn fetcher(service: Arc<FlakyService>, max_batch: usize) -> WindowedFetcher {
    let query = FileQuery::new(vec![], Some(FileSort::new("file_name", SortOrder::Asc)));
    WindowedFetcher::new(Arc::new(FileSet::new(query, service, 1000)), max_batch, 2)
  }

  #[test]
  fn test_visible_window() {
    let r = |from, to| NumericRange::new(from, to).ok();
    assert_eq!(visible_window(10, 5, 3, 100), r(7, 17));
    assert_eq!(visible_window(0, 5, 3, 100), r(0, 7));
    assert_eq!(visible_window(95, 10, 3, 100), r(92, 99));
    assert_eq!(visible_window(0, 5, 0, 0), None);
    assert_eq!(visible_window(100, 5, 0, 100), None);
    assert_eq!(visible_window(3, 0, 2, 100), None);
  }

  #[tokio::test]
  async fn test_load_more_items_skips_loaded_rows() {
    let service = flaky(50, 0);
    let fetcher = fetcher(service.clone(), 10);

    assert_eq!(fetcher.load_more_items(0, 4).await.unwrap(), 5);
    assert!(fetcher.is_item_loaded(4));
    let pages = service.pages.load(Ordering::SeqCst);

    // Already cached: no requests
    assert_eq!(fetcher.load_more_items(0, 4).await.unwrap(), 0);
    assert_eq!(service.pages.load(Ordering::SeqCst), pages);
  }

  #[tokio::test]
  async fn test_load_more_items_batches() {
    let service = flaky(50, 0);
    let fetcher = fetcher(service.clone(), 10);

    assert_eq!(fetcher.load_more_items(0, 24).await.unwrap(), 25);
    assert_eq!(service.pages.load(Ordering::SeqCst), 3);
    assert!((0..25).all(|i| fetcher.is_item_loaded(i)));
    assert_eq!(fetcher.in_flight(), 0);
  }

  #[tokio::test]
  async fn test_load_clamps_to_total() {
    let fetcher = fetcher(flaky(8, 0), 10);
    assert_eq!(fetcher.load_more_items(5, 50).await.unwrap(), 3);
    assert_eq!(fetcher.load_more_items(20, 30).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_failure_releases_in_flight() {
    let service = flaky(20, 1);
    let fetcher = fetcher(service.clone(), 10);

    assert!(fetcher.load_more_items(0, 4).await.is_err());
    assert_eq!(fetcher.in_flight(), 0);
    assert!(!fetcher.is_item_loaded(0));

    // The same rows can be requested again once the failure cleared
    assert_eq!(fetcher.load_more_items(0, 4).await.unwrap(), 5);
  }

  #[tokio::test]
  async fn test_rows() {
    let fetcher = fetcher(flaky(6, 0), 10);
    let rows = fetcher.rows(4, 7).await.unwrap();
    let ids: Vec<Option<String>> = rows.iter().map(|r| r.as_ref().map(|f| f.file_id.clone())).collect();
    let expected: Vec<Option<String>> = vec![Some("f004".into()), Some("f005".into()), None, None];
    assert_eq!(ids, expected);
  }

  /// Serves a local service slowly, recording how many page requests overlap.
  struct SlowService {
    inner: LocalFileService,
    delay: std::time::Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
    pages: AtomicUsize,
  }

  #[async_trait]
  impl FileService for SlowService {
    async fn count_matching_files(&self, query: &FileQuery) -> Result<usize, ServiceError> {
      self.inner.count_matching_files(query).await
    }

    async fn get_files(&self, query: &FileQuery, page: usize, limit: usize) -> Result<Vec<FileDetail>, ServiceError> {
      self.pages.fetch_add(1, Ordering::SeqCst);
      let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
      self.peak.fetch_max(active, Ordering::SeqCst);
      tokio::time::sleep(self.delay).await;
      self.active.fetch_sub(1, Ordering::SeqCst);
      self.inner.get_files(query, page, limit).await
    }

    async fn get_aggregate_information(&self, selections: &[SelectionRequest]) -> Result<AggregateInfo, ServiceError> {
      self.inner.get_aggregate_information(selections).await
    }
  }

  fn slow(count: usize) -> Arc<SlowService> {
    Arc::new(SlowService {
      inner: LocalFileService::new(sample_files(count)),
      delay: std::time::Duration::from_millis(50),
      active: AtomicUsize::new(0),
      peak: AtomicUsize::new(0),
      pages: AtomicUsize::new(0),
    })
  }

  fn slow_fetcher(service: Arc<SlowService>, max_batch: usize, max_concurrent: usize) -> WindowedFetcher {
    let query = FileQuery::new(vec![], Some(FileSort::new("file_name", SortOrder::Asc)));
    WindowedFetcher::new(Arc::new(FileSet::new(query, service, 1000)), max_batch, max_concurrent)
  }

  #[tokio::test]
  async fn test_overlapping_rows_wait_for_in_flight_batches() {
    let service = slow(20);
    let fetcher = slow_fetcher(service.clone(), 10, 2);

    let (first, second) = tokio::join!(fetcher.rows(0, 4), async {
      tokio::time::sleep(std::time::Duration::from_millis(10)).await;
      fetcher.rows(0, 4).await
    });

    let loaded = |rows: Vec<Option<Arc<FileDetail>>>| rows.iter().map(Option::is_some).collect::<Vec<_>>();
    assert_eq!(loaded(first.unwrap()), vec![true; 5]);
    assert_eq!(loaded(second.unwrap()), vec![true; 5]);
    // The second call reused the first call's request
    assert_eq!(service.pages.load(Ordering::SeqCst), 1);
    assert_eq!(fetcher.in_flight(), 0);
  }

  #[tokio::test]
  async fn test_concurrency_limit_spans_calls() {
    let service = slow(40);
    let fetcher = slow_fetcher(service.clone(), 5, 1);

    let (a, b) = tokio::join!(fetcher.load_more_items(0, 9), fetcher.load_more_items(20, 29));
    assert_eq!(a.unwrap(), 10);
    assert_eq!(b.unwrap(), 10);
    assert_eq!(service.pages.load(Ordering::SeqCst), 4);
    assert_eq!(service.peak.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_aligned_batches() {
    let r = |from, to| NumericRange::new(from, to).unwrap();
    assert_eq!(aligned_batches(r(5, 24), 10), vec![r(5, 9), r(10, 19), r(20, 24)]);
    assert_eq!(aligned_batches(r(10, 19), 10), vec![r(10, 19)]);
    assert_eq!(aligned_batches(r(3, 3), 10), vec![r(3, 3)]);
  }

  #[test]
  fn test_aligned_batches_keep_pages_tight() {
    use crate::browse::PageParameters;

    let batches = aligned_batches(NumericRange::new(99_999, 100_498).unwrap(), 500);
    for batch in &batches {
      let params = PageParameters::covering(batch.from(), batch.to());
      assert!(params.limit <= 500, "batch {} needs a page of {}", batch, params.limit);
    }
  }

  #[tokio::test]
  async fn test_unaligned_window_fetches_aligned_pages() {
    let service = flaky(50, 0);
    let fetcher = fetcher(service.clone(), 10);

    assert_eq!(fetcher.load_more_items(5, 24).await.unwrap(), 20);
    assert_eq!(service.pages.load(Ordering::SeqCst), 3);
    assert!(!fetcher.is_item_loaded(4));
    assert!(!fetcher.is_item_loaded(25));
  }
}
