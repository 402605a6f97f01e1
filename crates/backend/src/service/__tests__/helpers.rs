//! Shared fixtures for service-level and browsing tests.

use crate::domain::{annotation::AnnotationValue, file::{FileAnnotation, FileDetail}};

pub const GENES: [&str; 3] = ["LMNB1", "TOMM20", "SEC61B"];

/// Deterministic file `i`:
/// - `Cell line`: AICS-10 for even `i`, AICS-12 for odd
/// - `Gene`: cycles through [`GENES`]
/// - `Objective`: 100 for `i < 6`, else 63
/// - `Dye`: Hoechst on every fourth file, absent otherwise
/// - `file_size`: `(i + 1) * 1000`, `uploaded`: day `i + 1` of January 2023
pub fn sample_file(i: usize) -> FileDetail {
  let mut annotations = vec![
    FileAnnotation {
      name: "Cell line".to_string(),
      values: vec![if i % 2 == 0 { "AICS-10" } else { "AICS-12" }.into()],
    },
    FileAnnotation {
      name: "Gene".to_string(),
      values: vec![GENES[i % GENES.len()].into()],
    },
    FileAnnotation {
      name: "Objective".to_string(),
      values: vec![AnnotationValue::Number(if i < 6 { 100.0 } else { 63.0 })],
    },
  ];
  if i % 4 == 0 {
    annotations.push(FileAnnotation {
      name: "Dye".to_string(),
      values: vec!["Hoechst".into()],
    });
  }

  FileDetail {
    file_id: format!("f{:03}", i),
    file_name: format!("image_{:03}.czi", i),
    file_path: format!("/allen/data/image_{:03}.czi", i),
    file_size: Some((i as u64 + 1) * 1000),
    uploaded: Some(format!("2023-01-{:02}T00:00:00Z", (i % 28) + 1)),
    thumbnail: None,
    annotations,
  }
}

pub fn sample_files(count: usize) -> Vec<FileDetail> {
  (0..count).map(sample_file).collect()
}
