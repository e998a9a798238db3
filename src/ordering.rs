//! Load order of combined scripts.
//!
//! Scripts frequently hold hard references to globals defined by libraries, so library
//! files must come first. There is no dependency analysis: libraries are ordered among
//! themselves by path only, and projects that need a specific library order express it
//! through file and directory names.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::models::SourceFile;

/// Order paths so that every library precedes every application file, each partition
/// sorted by the byte-wise path.
pub fn order<F>(mut files: Vec<PathBuf>, is_library: F) -> Vec<PathBuf>
where
  F: Fn(&Path) -> bool,
{
  files.sort_by(|a, b| libraries_first(is_library(a), a, is_library(b), b));
  files
}

/// Order resolved scripts using the library flag computed during resolution.
pub fn order_javascript_files(mut files: Vec<SourceFile>) -> Vec<SourceFile> {
  files.sort_by(|a, b| libraries_first(a.is_library, &a.path, b.is_library, &b.path));
  files
}

fn libraries_first(a_is_library: bool, a: &Path, b_is_library: bool, b: &Path) -> Ordering {
  (!a_is_library)
    .cmp(&!b_is_library)
    .then_with(|| {
      a.as_os_str()
        .as_encoded_bytes()
        .cmp(b.as_os_str().as_encoded_bytes())
    })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::asset_paths::PathClassifier;
  use crate::models::AssetKind;

  fn names(files: &[PathBuf]) -> Vec<String> {
    files
      .iter()
      .map(|path| path.to_string_lossy().into_owned())
      .collect()
  }

  #[test]
  fn library_files_are_included_first() {
    let classifier = PathClassifier::default();
    let files = vec![
      PathBuf::from("/tmp/a.js"),
      PathBuf::from("/tmp/b.js"),
      PathBuf::from("/tmp/lib/c.js"),
      PathBuf::from("/tmp/lib/d.js"),
      PathBuf::from("/tmp/subdir/e.js"),
      PathBuf::from("/tmp/subdir/f.js"),
    ];

    let ordered = order(files, |path| classifier.is_library(path));
    assert_eq!(names(&ordered), vec![
      "/tmp/lib/c.js",
      "/tmp/lib/d.js",
      "/tmp/a.js",
      "/tmp/b.js",
      "/tmp/subdir/e.js",
      "/tmp/subdir/f.js",
    ]);
  }

  #[test]
  fn ordering_ignores_input_position() {
    let classifier = PathClassifier::default();
    let files = vec![
      PathBuf::from("/tmp/subdir/e.js"),
      PathBuf::from("/tmp/lib/d.js"),
      PathBuf::from("/tmp/a.js"),
      PathBuf::from("/tmp/lib/c.js"),
    ];

    let ordered = order(files, |path| classifier.is_library(path));
    assert_eq!(names(&ordered), vec![
      "/tmp/lib/c.js",
      "/tmp/lib/d.js",
      "/tmp/a.js",
      "/tmp/subdir/e.js",
    ]);
  }

  #[test]
  fn compares_paths_byte_wise() {
    let files = vec![PathBuf::from("/tmp/b.js"), PathBuf::from("/tmp/B.js")];
    let ordered = order(files, |_| false);
    assert_eq!(names(&ordered), vec!["/tmp/B.js", "/tmp/b.js"]);
  }

  #[test]
  fn orders_source_files_by_library_flag() {
    let source = |path: &str, is_library: bool| SourceFile {
      path: PathBuf::from(path),
      relative_path: path.trim_start_matches("/web/").to_string(),
      kind: AssetKind::JavaScript,
      is_library,
    };

    let ordered = order_javascript_files(vec![
      source("/web/app.js", false),
      source("/web/vendor/z.js", true),
      source("/web/node_modules/a.js", true),
    ]);
    let relative: Vec<&str> = ordered.iter().map(|f| f.relative_path.as_str()).collect();
    assert_eq!(relative, vec!["node_modules/a.js", "vendor/z.js", "app.js"]);
  }
}
