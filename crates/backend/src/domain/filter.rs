//! File filters, sort order, and the query they form together.
//!
//! A [`FileQuery`] is the identity of a file set: two queries with the same
//! filters (in any order) and sort compare, hash and serialize identically.

use std::{
  cmp::Ordering,
  collections::{BTreeMap, BTreeSet},
  fmt,
};

use serde::{Deserialize, Serialize};

use super::{
  annotation::{AnnotationValue, UPLOADED},
  file::FileDetail,
};

/// A single filter applied to a file set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
  /// `name=value`. Several values for one name are OR'd together.
  Value { name: String, value: String },
  /// File has any value for the annotation.
  Include { name: String },
  /// File has no value for the annotation.
  Exclude { name: String },
  /// Value filters on this annotation match by case-insensitive substring.
  Fuzzy { name: String },
}

impl Filter {
  pub fn value(name: impl Into<String>, value: impl Into<String>) -> Self {
    Filter::Value {
      name: name.into(),
      value: value.into(),
    }
  }

  pub fn include(name: impl Into<String>) -> Self {
    Filter::Include { name: name.into() }
  }

  pub fn exclude(name: impl Into<String>) -> Self {
    Filter::Exclude { name: name.into() }
  }

  pub fn fuzzy(name: impl Into<String>) -> Self {
    Filter::Fuzzy { name: name.into() }
  }

  pub fn name(&self) -> &str {
    match self {
      Filter::Value { name, .. } | Filter::Include { name } | Filter::Exclude { name } | Filter::Fuzzy { name } => name,
    }
  }

  fn rank(&self) -> u8 {
    match self {
      Filter::Value { .. } => 0,
      Filter::Include { .. } => 1,
      Filter::Exclude { .. } => 2,
      Filter::Fuzzy { .. } => 3,
    }
  }

  fn value_str(&self) -> &str {
    match self {
      Filter::Value { value, .. } => value,
      _ => "",
    }
  }

  pub fn to_query_string(&self) -> String {
    match self {
      Filter::Value { name, value } => format!("{}={}", urlencoding::encode(name), urlencoding::encode(value)),
      Filter::Include { name } => format!("include={}", urlencoding::encode(name)),
      Filter::Exclude { name } => format!("exclude={}", urlencoding::encode(name)),
      Filter::Fuzzy { name } => format!("fuzzy={}", urlencoding::encode(name)),
    }
  }
}

impl Ord for Filter {
  fn cmp(&self, other: &Self) -> Ordering {
    self
      .name()
      .cmp(other.name())
      .then(self.rank().cmp(&other.rank()))
      .then(self.value_str().cmp(other.value_str()))
  }
}

impl PartialOrd for Filter {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl fmt::Display for Filter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Filter::Value { name, value } => write!(f, "{} = {}", name, value),
      Filter::Include { name } => write!(f, "{} (any value)", name),
      Filter::Exclude { name } => write!(f, "{} (no value)", name),
      Filter::Fuzzy { name } => write!(f, "{} (fuzzy)", name),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl SortOrder {
  pub fn as_str(&self) -> &'static str {
    match self {
      SortOrder::Asc => "ASC",
      SortOrder::Desc => "DESC",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSort {
  pub annotation_name: String,
  pub order: SortOrder,
}

impl FileSort {
  pub fn new(annotation_name: impl Into<String>, order: SortOrder) -> Self {
    Self {
      annotation_name: annotation_name.into(),
      order,
    }
  }

  pub fn to_query_string(&self) -> String {
    format!(
      "sort={}({})",
      urlencoding::encode(&self.annotation_name),
      self.order.as_str()
    )
  }
}

impl Default for FileSort {
  /// Newest uploads first.
  fn default() -> Self {
    Self::new(UPLOADED, SortOrder::Desc)
  }
}

/// Filters plus sort order describing a set of files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Default)]
pub struct FileQuery {
  filters: Vec<Filter>,
  sort: Option<FileSort>,
}

impl FileQuery {
  pub fn new(filters: impl IntoIterator<Item = Filter>, sort: Option<FileSort>) -> Self {
    let filters: BTreeSet<Filter> = filters.into_iter().collect();
    Self {
      filters: filters.into_iter().collect(),
      sort,
    }
  }

  pub fn filters(&self) -> &[Filter] {
    &self.filters
  }

  pub fn sort(&self) -> Option<&FileSort> {
    self.sort.as_ref()
  }

  pub fn with_filter(&self, filter: Filter) -> Self {
    Self::new(self.filters.iter().cloned().chain(std::iter::once(filter)), self.sort.clone())
  }

  pub fn without_filter(&self, filter: &Filter) -> Self {
    Self::new(
      self.filters.iter().filter(|f| *f != filter).cloned(),
      self.sort.clone(),
    )
  }

  pub fn with_sort(&self, sort: Option<FileSort>) -> Self {
    Self {
      filters: self.filters.clone(),
      sort,
    }
  }

  /// `name=value` filters grouped by annotation name.
  pub fn value_filters_by_name(&self) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for filter in &self.filters {
      if let Filter::Value { name, value } = filter {
        grouped.entry(name.clone()).or_default().push(value.clone());
      }
    }
    grouped
  }

  /// Names of annotations carrying a filter of the given shape.
  pub fn names_where(&self, predicate: impl Fn(&Filter) -> bool) -> Vec<String> {
    self
      .filters
      .iter()
      .filter(|f| predicate(f))
      .map(|f| f.name().to_string())
      .collect()
  }

  /// Canonical query string, e.g. `Gene=LMNB1&include=Objective&sort=uploaded(DESC)`.
  pub fn to_query_string(&self) -> String {
    self
      .filters
      .iter()
      .map(Filter::to_query_string)
      .chain(self.sort.iter().map(FileSort::to_query_string))
      .collect::<Vec<_>>()
      .join("&")
  }

  /// Evaluate the filters against a file locally.
  pub fn matches(&self, file: &FileDetail) -> bool {
    let fuzzy: BTreeSet<&str> = self
      .filters
      .iter()
      .filter_map(|f| match f {
        Filter::Fuzzy { name } => Some(name.as_str()),
        _ => None,
      })
      .collect();

    for (name, expected) in self.value_filters_by_name() {
      let Some(actual) = file.values_for(&name) else {
        return false;
      };
      let is_fuzzy = fuzzy.contains(name.as_str());
      let any_match = expected
        .iter()
        .any(|e| actual.iter().any(|a| value_matches(a, e, is_fuzzy)));
      if !any_match {
        return false;
      }
    }

    self.filters.iter().all(|filter| match filter {
      Filter::Include { name } => file.has_value_for(name),
      Filter::Exclude { name } => !file.has_value_for(name),
      Filter::Value { .. } | Filter::Fuzzy { .. } => true,
    })
  }

  /// Order two files by this query's sort. Files without a value sort last;
  /// ties fall back to `file_id` so the order is total.
  pub fn compare(&self, a: &FileDetail, b: &FileDetail) -> Ordering {
    let Some(sort) = &self.sort else {
      return a.file_id.cmp(&b.file_id);
    };

    let key_a = a.values_for(&sort.annotation_name).and_then(|v| v.into_iter().min());
    let key_b = b.values_for(&sort.annotation_name).and_then(|v| v.into_iter().min());

    let ordering = match (key_a, key_b) {
      (Some(x), Some(y)) => match sort.order {
        SortOrder::Asc => x.cmp(&y),
        SortOrder::Desc => y.cmp(&x),
      },
      (Some(_), None) => Ordering::Less,
      (None, Some(_)) => Ordering::Greater,
      (None, None) => Ordering::Equal,
    };
    ordering.then_with(|| a.file_id.cmp(&b.file_id))
  }
}

fn value_matches(actual: &AnnotationValue, expected: &str, fuzzy: bool) -> bool {
  let actual = actual.to_string();
  if fuzzy {
    return actual.to_lowercase().contains(&expected.to_lowercase());
  }
  actual == expected
    || (matches!(actual.as_str(), "true" | "false") && actual.eq_ignore_ascii_case(expected))
    || matches!(
      (actual.parse::<f64>(), expected.parse::<f64>()),
      (Ok(x), Ok(y)) if x == y
    )
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::domain::file::FileAnnotation;

  fn file(id: &str, annotations: &[(&str, &[&str])]) -> FileDetail {
    FileDetail {
      file_id: id.to_string(),
      file_name: format!("{}.czi", id),
      file_path: format!("/data/{}.czi", id),
      file_size: None,
      uploaded: None,
      thumbnail: None,
      annotations: annotations
        .iter()
        .map(|(name, values)| FileAnnotation {
          name: name.to_string(),
          values: values.iter().map(|v| AnnotationValue::from(*v)).collect(),
        })
        .collect(),
    }
  }

  #[test]
  fn test_query_string_is_canonical() {
    let a = FileQuery::new(
      vec![Filter::value("Gene", "LMNB1"), Filter::include("Objective"), Filter::value("Cell line", "AICS-10")],
      Some(FileSort::default()),
    );
    let b = FileQuery::new(
      vec![Filter::include("Objective"), Filter::value("Cell line", "AICS-10"), Filter::value("Gene", "LMNB1")],
      Some(FileSort::default()),
    );
    assert_eq!(a, b);
    assert_eq!(
      a.to_query_string(),
      "Cell%20line=AICS-10&Gene=LMNB1&include=Objective&sort=uploaded(DESC)"
    );
  }

  #[test]
  fn test_duplicate_filters_collapse() {
    let query = FileQuery::new(vec![Filter::value("Gene", "A"), Filter::value("Gene", "A")], None);
    assert_eq!(query.filters().len(), 1);
  }

  #[test]
  fn test_filter_query_strings() {
    assert_eq!(Filter::exclude("Is Split Scene").to_query_string(), "exclude=Is%20Split%20Scene");
    assert_eq!(Filter::fuzzy("file_name").to_query_string(), "fuzzy=file_name");
    assert_eq!(FileSort::new("Gene", SortOrder::Asc).to_query_string(), "sort=Gene(ASC)");
  }

  #[test]
  fn test_with_and_without_filter() {
    let base = FileQuery::new(vec![Filter::value("Gene", "A")], None);
    let extended = base.with_filter(Filter::value("Gene", "B"));
    assert_eq!(extended.filters().len(), 2);
    assert_eq!(extended.without_filter(&Filter::value("Gene", "B")), base);
  }

  #[test]
  fn test_value_filters_or_within_name_and_across_names() {
    let query = FileQuery::new(
      vec![
        Filter::value("Gene", "LMNB1"),
        Filter::value("Gene", "TOMM20"),
        Filter::value("Cell line", "AICS-10"),
      ],
      None,
    );
    assert!(query.matches(&file("a", &[("Gene", &["TOMM20"]), ("Cell line", &["AICS-10"])])));
    assert!(!query.matches(&file("b", &[("Gene", &["TOMM20"]), ("Cell line", &["AICS-12"])])));
    assert!(!query.matches(&file("c", &[("Gene", &["TOMM20"])])));
  }

  #[test]
  fn test_include_and_exclude() {
    let query = FileQuery::new(vec![Filter::include("Gene"), Filter::exclude("Dye")], None);
    assert!(query.matches(&file("a", &[("Gene", &["X"])])));
    assert!(!query.matches(&file("b", &[("Gene", &["X"]), ("Dye", &["Y"])])));
    assert!(!query.matches(&file("c", &[])));
  }

  #[test]
  fn test_fuzzy_matching() {
    let query = FileQuery::new(vec![Filter::value("file_name", "CELLS"), Filter::fuzzy("file_name")], None);
    let mut matching = file("x", &[]);
    matching.file_name = "my_cells_01.czi".to_string();
    assert!(query.matches(&matching));
    assert!(!query.matches(&file("y", &[])));
  }

  #[test]
  fn test_numeric_values_match_textual_filters() {
    let mut f = file("a", &[]);
    f.annotations.push(FileAnnotation {
      name: "Objective".to_string(),
      values: vec![AnnotationValue::Number(100.0)],
    });
    assert!(FileQuery::new(vec![Filter::value("Objective", "100")], None).matches(&f));
    assert!(FileQuery::new(vec![Filter::value("Objective", "100.0")], None).matches(&f));
  }

  #[test]
  fn test_compare_sorts_missing_last() {
    let query = FileQuery::new(vec![], Some(FileSort::new("Gene", SortOrder::Desc)));
    let mut files = vec![
      file("1", &[("Gene", &["A"])]),
      file("2", &[]),
      file("3", &[("Gene", &["C"])]),
      file("4", &[("Gene", &["B"])]),
    ];
    files.sort_by(|a, b| query.compare(a, b));
    let ids: Vec<_> = files.iter().map(|f| f.file_id.as_str()).collect();
    assert_eq!(ids, vec!["3", "4", "1", "2"]);
  }
}
