//! Percent-encoding query string builder.

/// Builder for URL query strings.
///
/// Keys and values are percent-encoded; fragments added with [`QueryBuilder::add_raw`]
/// are assumed to be encoded already.
///
/// # Example
/// ```ignore
/// let path = QueryBuilder::new()
///     .add_all("order", &["Cell line", "Gene"])
///     .add("path", "AICS-10")
///     .build_path("annotations/hierarchy/under-path");
/// // Result: "annotations/hierarchy/under-path?order=Cell%20line&order=Gene&path=AICS-10"
/// ```
#[derive(Debug, Default)]
pub struct QueryBuilder {
  params: Vec<String>,
}

impl QueryBuilder {
  /// Create a new empty query builder.
  pub fn new() -> Self {
    Self { params: Vec::new() }
  }

  /// Add `key=value`.
  pub fn add(mut self, key: &str, value: impl std::fmt::Display) -> Self {
    self.params.push(format!(
      "{}={}",
      urlencoding::encode(key),
      urlencoding::encode(&value.to_string())
    ));
    self
  }

  /// Add `key=value` only if the value is Some.
  pub fn add_opt(self, key: &str, value: Option<impl std::fmt::Display>) -> Self {
    match value {
      Some(v) => self.add(key, v),
      None => self,
    }
  }

  /// Repeat `key` once per value, preserving order.
  pub fn add_all<S: AsRef<str>>(self, key: &str, values: &[S]) -> Self {
    values.iter().fold(self, |builder, v| builder.add(key, v.as_ref()))
  }

  /// Add an already-encoded fragment such as `Gene=LMNB1&include=Dye`. Empty fragments are skipped.
  pub fn add_raw(mut self, fragment: impl Into<String>) -> Self {
    let fragment = fragment.into();
    if !fragment.is_empty() {
      self.params.push(fragment);
    }
    self
  }

  /// Check if any parameters have been added.
  pub fn is_empty(&self) -> bool {
    self.params.is_empty()
  }

  /// Build the query string without a leading `?`.
  pub fn build(self) -> String {
    self.params.join("&")
  }

  /// Append the query to `path`, omitting the `?` when there are no parameters.
  pub fn build_path(self, path: &str) -> String {
    if self.is_empty() {
      path.to_string()
    } else {
      format!("{}?{}", path, self.build())
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_builder() {
    assert!(QueryBuilder::new().is_empty());
    assert_eq!(QueryBuilder::new().build_path("files/count"), "files/count");
  }

  #[test]
  fn test_encodes_keys_and_values() {
    let query = QueryBuilder::new().add("Cell line", "AICS-10 & 12").build();
    assert_eq!(query, "Cell%20line=AICS-10%20%26%2012");
  }

  #[test]
  fn test_repeated_keys_keep_order() {
    let path = QueryBuilder::new()
      .add_all("order", &["Cell line", "Gene"])
      .add("path", "AICS-10")
      .build_path("annotations/hierarchy/under-path");
    assert_eq!(
      path,
      "annotations/hierarchy/under-path?order=Cell%20line&order=Gene&path=AICS-10"
    );
  }

  #[test]
  fn test_optional_and_raw() {
    let query = QueryBuilder::new()
      .add("from", 2)
      .add_opt("version", None::<u32>)
      .add_raw("")
      .add_raw("include=Dye")
      .build();
    assert_eq!(query, "from=2&include=Dye");
  }
}
