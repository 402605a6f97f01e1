//! Inclusive integer ranges over row indexes.
//!
//! Selections and fetch windows are tracked as sets of `NumericRange`s. The set
//! operations here keep those sets small: overlapping or abutting ranges are
//! merged by [`NumericRange::compact`] before they are sent anywhere.

use std::{cmp::Ordering, fmt, ops::RangeInclusive};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
  #[error("Invalid range: from ({from}) is greater than to ({to})")]
  Inverted { from: usize, to: usize },
  #[error("Cannot union {left} and {right}: ranges neither intersect nor abut")]
  Disjoint { left: NumericRange, right: NumericRange },
}

/// Inclusive range `[from, to]`. Always satisfies `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct NumericRange {
  from: usize,
  to: usize,
}

#[derive(Deserialize)]
struct RawRange {
  from: usize,
  to: usize,
}

impl TryFrom<RawRange> for NumericRange {
  type Error = RangeError;

  fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
    NumericRange::new(raw.from, raw.to)
  }
}

impl NumericRange {
  pub fn new(from: usize, to: usize) -> Result<Self, RangeError> {
    if from > to {
      return Err(RangeError::Inverted { from, to });
    }
    Ok(Self { from, to })
  }

  /// Range containing exactly one index.
  pub fn single(index: usize) -> Self {
    Self { from: index, to: index }
  }

  pub fn from(&self) -> usize {
    self.from
  }

  pub fn to(&self) -> usize {
    self.to
  }

  /// Number of indexes in the range (never zero).
  pub fn length(&self) -> usize {
    self.to - self.from + 1
  }

  pub fn contains(&self, index: usize) -> bool {
    self.from <= index && index <= self.to
  }

  pub fn contains_range(&self, other: &NumericRange) -> bool {
    self.from <= other.from && other.to <= self.to
  }

  pub fn intersects(&self, other: &NumericRange) -> bool {
    self.from <= other.to && other.from <= self.to
  }

  /// True when the ranges touch end to start without overlapping, e.g. `[0,3]` and `[4,9]`.
  pub fn abuts(&self, other: &NumericRange) -> bool {
    self.to.checked_add(1) == Some(other.from) || other.to.checked_add(1) == Some(self.from)
  }

  /// Merge two ranges that intersect or abut.
  pub fn union(&self, other: &NumericRange) -> Result<NumericRange, RangeError> {
    if !self.intersects(other) && !self.abuts(other) {
      return Err(RangeError::Disjoint {
        left: *self,
        right: *other,
      });
    }
    Ok(Self {
      from: self.from.min(other.from),
      to: self.to.max(other.to),
    })
  }

  pub fn intersection(&self, other: &NumericRange) -> Option<NumericRange> {
    if !self.intersects(other) {
      return None;
    }
    Some(Self {
      from: self.from.max(other.from),
      to: self.to.min(other.to),
    })
  }

  /// Remove a single index, splitting the range in two if it falls in the middle.
  pub fn partition_at(&self, index: usize) -> Vec<NumericRange> {
    self.difference(&NumericRange::single(index))
  }

  /// Everything in `self` that is not in `other` (zero, one or two ranges).
  pub fn difference(&self, other: &NumericRange) -> Vec<NumericRange> {
    let Some(overlap) = self.intersection(other) else {
      return vec![*self];
    };

    let mut remaining = Vec::with_capacity(2);
    if overlap.from > self.from {
      remaining.push(Self {
        from: self.from,
        to: overlap.from - 1,
      });
    }
    if overlap.to < self.to {
      remaining.push(Self {
        from: overlap.to + 1,
        to: self.to,
      });
    }
    remaining
  }

  /// Smallest range covering both `self` and `index`.
  pub fn expand_to(&self, index: usize) -> NumericRange {
    Self {
      from: self.from.min(index),
      to: self.to.max(index),
    }
  }

  pub fn iter(&self) -> RangeInclusive<usize> {
    self.from..=self.to
  }

  /// Sort and merge overlapping or abutting ranges.
  ///
  /// The output is sorted by `from` and no two ranges in it intersect or abut.
  pub fn compact(ranges: impl IntoIterator<Item = NumericRange>) -> Vec<NumericRange> {
    let mut sorted: Vec<NumericRange> = ranges.into_iter().collect();
    sorted.sort_unstable();

    let mut compacted: Vec<NumericRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
      match compacted.last_mut() {
        Some(last) if last.intersects(&range) || last.abuts(&range) => {
          last.to = last.to.max(range.to);
        }
        _ => compacted.push(range),
      }
    }
    compacted
  }
}

impl Ord for NumericRange {
  fn cmp(&self, other: &Self) -> Ordering {
    self.from.cmp(&other.from).then(self.to.cmp(&other.to))
  }
}

impl PartialOrd for NumericRange {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl fmt::Display for NumericRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{},{}]", self.from, self.to)
  }
}

impl IntoIterator for NumericRange {
  type Item = usize;
  type IntoIter = RangeInclusive<usize>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}
