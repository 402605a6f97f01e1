//! Selected rows across one or more file sets.
//!
//! Rows are tracked as compacted index ranges per file set, so selecting a
//! contiguous block of a 100k-row set costs one range, not 100k entries.

use std::sync::Arc;

use futures::future::try_join_all;
use tracing::debug;

use super::file_set::FileSet;
use crate::{
  domain::{file::FileDetail, range::NumericRange},
  service::{AggregateInfo, FileService, SelectionRequest, ServiceError},
};

/// Largest range fetched by a single request in [`FileSelection::fetch_all_details`].
const DETAIL_FETCH_CHUNK: usize = 500;

#[derive(Debug, Clone)]
struct SelectionEntry {
  file_set: Arc<FileSet>,
  ranges: Vec<NumericRange>,
}

impl SelectionEntry {
  fn count(&self) -> usize {
    self.ranges.iter().map(NumericRange::length).sum()
  }

  fn contains(&self, index: usize) -> bool {
    self.ranges.iter().any(|r| r.contains(index))
  }
}

/// The item keyboard navigation and range selection start from.
#[derive(Debug, Clone)]
pub struct FocusedItem {
  pub file_set: Arc<FileSet>,
  pub index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FileSelection {
  entries: Vec<SelectionEntry>,
  focused: Option<FocusedItem>,
}

impl FileSelection {
  pub fn new() -> Self {
    Self::default()
  }

  fn entry(&self, file_set: &FileSet) -> Option<&SelectionEntry> {
    self.entries.iter().find(|e| e.file_set.hash() == file_set.hash())
  }

  /// Add `range` to the selection and focus `focus`, or the end of the range when `None`.
  pub fn select(&mut self, file_set: &Arc<FileSet>, range: NumericRange, focus: Option<usize>) {
    match self.entries.iter_mut().find(|e| e.file_set.hash() == file_set.hash()) {
      Some(entry) => {
        entry.ranges.push(range);
        entry.ranges = NumericRange::compact(std::mem::take(&mut entry.ranges));
      }
      None => self.entries.push(SelectionEntry {
        file_set: file_set.clone(),
        ranges: vec![range],
      }),
    }
    self.focused = Some(FocusedItem {
      file_set: file_set.clone(),
      index: focus.unwrap_or(range.to()),
    });
  }

  /// Remove `range`. When the focused item is removed, focus moves to the last selected item.
  pub fn deselect(&mut self, file_set: &FileSet, range: NumericRange) {
    for entry in self.entries.iter_mut().filter(|e| e.file_set.hash() == file_set.hash()) {
      entry.ranges = entry.ranges.iter().flat_map(|r| r.difference(&range)).collect();
    }
    self.entries.retain(|e| !e.ranges.is_empty());

    let focus_removed = self
      .focused
      .as_ref()
      .is_some_and(|f| !self.is_selected(&f.file_set, f.index));
    if focus_removed {
      self.focused = self.entries.last().and_then(|e| {
        e.ranges.last().map(|r| FocusedItem {
          file_set: e.file_set.clone(),
          index: r.to(),
        })
      });
    }
  }

  /// Select `index` if it is not selected, deselect it otherwise.
  pub fn toggle(&mut self, file_set: &Arc<FileSet>, index: usize) {
    if self.is_selected(file_set, index) {
      self.deselect(file_set, NumericRange::single(index));
    } else {
      self.select(file_set, NumericRange::single(index), Some(index));
    }
  }

  /// Extend the selection from the focused item to `index` (shift-click). The focus stays put.
  ///
  /// Without a focused item in the same file set this selects `index` alone.
  pub fn select_to(&mut self, file_set: &Arc<FileSet>, index: usize) {
    match &self.focused {
      Some(focused) if focused.file_set.hash() == file_set.hash() => {
        let anchor = focused.index;
        let range = NumericRange::single(anchor).expand_to(index);
        self.select(file_set, range, Some(anchor));
      }
      _ => self.select(file_set, NumericRange::single(index), Some(index)),
    }
  }

  pub fn clear(&mut self) {
    self.entries.clear();
    self.focused = None;
  }

  pub fn is_selected(&self, file_set: &FileSet, index: usize) -> bool {
    self.entry(file_set).is_some_and(|e| e.contains(index))
  }

  pub fn is_focused(&self, file_set: &FileSet, index: usize) -> bool {
    self
      .focused
      .as_ref()
      .is_some_and(|f| f.file_set.hash() == file_set.hash() && f.index == index)
  }

  pub fn focus(&self) -> Option<&FocusedItem> {
    self.focused.as_ref()
  }

  /// Number of selected rows across all file sets.
  pub fn count(&self) -> usize {
    self.entries.iter().map(SelectionEntry::count).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn file_sets(&self) -> Vec<Arc<FileSet>> {
    self.entries.iter().map(|e| e.file_set.clone()).collect()
  }

  /// Selected ranges of one file set.
  pub fn ranges(&self, file_set: &FileSet) -> &[NumericRange] {
    self.entry(file_set).map(|e| e.ranges.as_slice()).unwrap_or_default()
  }

  /// The `n`th selected row counting across file sets in selection order.
  pub fn item_at(&self, mut n: usize) -> Option<(Arc<FileSet>, usize)> {
    for entry in &self.entries {
      for range in &entry.ranges {
        if n < range.length() {
          return Some((entry.file_set.clone(), range.from() + n));
        }
        n -= range.length();
      }
    }
    None
  }

  /// One request per file set with its ranges compacted.
  pub fn to_compact_selection_list(&self) -> Vec<SelectionRequest> {
    self
      .entries
      .iter()
      .map(|e| SelectionRequest::new(e.file_set.query(), e.ranges.iter().copied()))
      .collect()
  }

  /// Fetch every selected file, in selection order.
  pub async fn fetch_all_details(&self) -> Result<Vec<FileDetail>, ServiceError> {
    let fetches = self.entries.iter().flat_map(|entry| {
      entry.ranges.iter().flat_map(move |range| {
        chunks(*range, DETAIL_FETCH_CHUNK)
          .into_iter()
          .map(move |chunk| entry.file_set.fetch_file_range(chunk.from(), chunk.to()))
      })
    });

    let batches = try_join_all(fetches).await?;
    let files: Vec<FileDetail> = batches
      .into_iter()
      .flatten()
      .map(|f| FileDetail::clone(&f))
      .collect();
    debug!(selected = self.count(), fetched = files.len(), "Fetched selected file details");
    Ok(files)
  }

  /// Count and size of the selected files, computed by the service.
  pub async fn aggregate(&self, service: &dyn FileService) -> Result<AggregateInfo, ServiceError> {
    service.get_aggregate_information(&self.to_compact_selection_list()).await
  }
}

/// Split a range into consecutive pieces of at most `size` rows.
pub(crate) fn chunks(range: NumericRange, size: usize) -> Vec<NumericRange> {
  let size = size.max(1);
  let mut pieces = Vec::with_capacity(range.length().div_ceil(size));
  let mut start = range.from();
  loop {
    let end = start.saturating_add(size - 1).min(range.to());
    pieces.push(NumericRange::single(start).expand_to(end));
    if end == range.to() {
      return pieces;
    }
    start = end + 1;
  }
}
