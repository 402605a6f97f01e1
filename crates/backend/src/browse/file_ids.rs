//! Background collection of every file id matching a query.
//!
//! Used when an action needs the whole result set (dataset creation, export)
//! rather than the rows on screen. The fetch runs on its own task, reports
//! progress on a `watch` channel and stops at the next page boundary once cancelled.

use std::sync::Arc;

use tokio::{sync::watch, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
  domain::filter::FileQuery,
  service::{FileService, ServiceError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FetchProgress {
  pub fetched: usize,
  /// Unknown until the count request returns
  pub total: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  Complete(Vec<String>),
  Cancelled,
}

/// Handle to a running fetch.
pub struct FileIdFetch {
  progress: watch::Receiver<FetchProgress>,
  cancel: CancellationToken,
  handle: JoinHandle<Result<FetchOutcome, ServiceError>>,
}

impl FileIdFetch {
  pub fn progress(&self) -> FetchProgress {
    *self.progress.borrow()
  }

  /// Receiver that is notified on every page.
  pub fn subscribe(&self) -> watch::Receiver<FetchProgress> {
    self.progress.clone()
  }

  pub fn cancel(&self) {
    self.cancel.cancel();
  }

  pub fn is_cancelled(&self) -> bool {
    self.cancel.is_cancelled()
  }

  pub async fn wait(self) -> Result<FetchOutcome, ServiceError> {
    self
      .handle
      .await
      .map_err(|e| ServiceError::internal(format!("file id fetch task failed: {}", e)))?
  }
}

pub struct FileIdFetcher {
  service: Arc<dyn FileService>,
  page_size: usize,
  current: Option<CancellationToken>,
}

impl FileIdFetcher {
  pub fn new(service: Arc<dyn FileService>, page_size: usize) -> Self {
    Self {
      service,
      page_size: page_size.max(1),
      current: None,
    }
  }

  /// Start fetching the ids for `query`. A fetch started earlier by this fetcher is cancelled.
  pub fn spawn(&mut self, query: FileQuery) -> FileIdFetch {
    if let Some(previous) = self.current.take() {
      previous.cancel();
    }

    let cancel = CancellationToken::new();
    let (progress_tx, progress_rx) = watch::channel(FetchProgress::default());
    let handle = tokio::spawn(fetch_all(
      self.service.clone(),
      query,
      self.page_size,
      progress_tx,
      cancel.clone(),
    ));
    self.current = Some(cancel.clone());

    FileIdFetch {
      progress: progress_rx,
      cancel,
      handle,
    }
  }

  /// Cancel the most recent fetch, if any.
  pub fn cancel(&mut self) {
    if let Some(cancel) = self.current.take() {
      cancel.cancel();
    }
  }
}

async fn fetch_all(
  service: Arc<dyn FileService>,
  query: FileQuery,
  page_size: usize,
  progress: watch::Sender<FetchProgress>,
  cancel: CancellationToken,
) -> Result<FetchOutcome, ServiceError> {
  let total = tokio::select! {
    biased;

    _ = cancel.cancelled() => return Ok(FetchOutcome::Cancelled),
    count = service.count_matching_files(&query) => count?,
  };
  progress.send_replace(FetchProgress {
    fetched: 0,
    total: Some(total),
  });

  let mut ids = Vec::with_capacity(total);
  let mut page = 0;
  while ids.len() < total {
    let files = tokio::select! {
      biased;

      _ = cancel.cancelled() => {
        debug!(fetched = ids.len(), total, "File id fetch cancelled");
        return Ok(FetchOutcome::Cancelled);
      }
      files = service.get_files(&query, page, page_size) => files?,
    };
    if files.is_empty() {
      break;
    }

    ids.extend(files.into_iter().map(|f| f.file_id));
    page += 1;
    progress.send_replace(FetchProgress {
      fetched: ids.len(),
      total: Some(total),
    });
  }

  info!(query = %query.to_query_string(), fetched = ids.len(), "Fetched file ids");
  Ok(FetchOutcome::Complete(ids))
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::{
    domain::{
      file::FileDetail,
      filter::{FileSort, Filter, SortOrder},
    },
    service::{AggregateInfo, LocalFileService, SelectionRequest, __tests__::helpers::sample_files},
  };

  /// Counts normally but never answers a page request.
  struct StalledService {
    inner: LocalFileService,
  }

  #[async_trait]
  impl FileService for StalledService {
    async fn count_matching_files(&self, query: &FileQuery) -> Result<usize, ServiceError> {
      self.inner.count_matching_files(query).await
    }

    async fn get_files(&self, _query: &FileQuery, _page: usize, _limit: usize) -> Result<Vec<FileDetail>, ServiceError> {
      std::future::pending().await
    }

    async fn get_aggregate_information(&self, selections: &[SelectionRequest]) -> Result<AggregateInfo, ServiceError> {
      self.inner.get_aggregate_information(selections).await
    }
  }

  fn by_name() -> Option<FileSort> {
    Some(FileSort::new("file_name", SortOrder::Asc))
  }

  #[tokio::test]
  async fn test_fetches_every_page() {
    let service = Arc::new(LocalFileService::new(sample_files(25)));
    let mut fetcher = FileIdFetcher::new(service, 10);

    let fetch = fetcher.spawn(FileQuery::new(vec![], by_name()));
    let mut progress = fetch.subscribe();
    let outcome = fetch.wait().await.unwrap();

    let expected: Vec<String> = (0..25).map(|i| format!("f{:03}", i)).collect();
    assert_eq!(outcome, FetchOutcome::Complete(expected));
    assert_eq!(
      *progress.borrow_and_update(),
      FetchProgress {
        fetched: 25,
        total: Some(25)
      }
    );
  }

  #[tokio::test]
  async fn test_filtered_fetch() {
    let service = Arc::new(LocalFileService::new(sample_files(12)));
    let mut fetcher = FileIdFetcher::new(service, 2);

    let fetch = fetcher.spawn(FileQuery::new(vec![Filter::include("Dye")], by_name()));
    let outcome = fetch.wait().await.unwrap();
    let expected: Vec<String> = vec!["f000".into(), "f004".into(), "f008".into()];
    assert_eq!(outcome, FetchOutcome::Complete(expected));
  }

  #[tokio::test]
  async fn test_cancel_resolves_to_cancelled() {
    let service = Arc::new(StalledService {
      inner: LocalFileService::new(sample_files(5)),
    });
    let mut fetcher = FileIdFetcher::new(service, 10);

    let fetch = fetcher.spawn(FileQuery::default());
    fetch.cancel();
    assert!(fetch.is_cancelled());
    assert_eq!(fetch.wait().await.unwrap(), FetchOutcome::Cancelled);
  }

  #[tokio::test]
  async fn test_new_fetch_cancels_previous() {
    let stalled = Arc::new(StalledService {
      inner: LocalFileService::new(sample_files(5)),
    });
    let mut fetcher = FileIdFetcher::new(stalled, 10);

    let first = fetcher.spawn(FileQuery::default());
    let second = fetcher.spawn(FileQuery::new(vec![Filter::value("Gene", "LMNB1")], None));
    assert!(first.is_cancelled());
    assert!(!second.is_cancelled());
    assert_eq!(first.wait().await.unwrap(), FetchOutcome::Cancelled);

    fetcher.cancel();
    assert_eq!(second.wait().await.unwrap(), FetchOutcome::Cancelled);
  }

  #[tokio::test]
  async fn test_empty_result() {
    let service = Arc::new(LocalFileService::new(sample_files(3)));
    let mut fetcher = FileIdFetcher::new(service, 10);
    let fetch = fetcher.spawn(FileQuery::new(vec![Filter::value("Gene", "nope")], None));
    assert_eq!(fetch.wait().await.unwrap(), FetchOutcome::Complete(Vec::new()));
  }
}
