use std::path::{Component, Path};

/// Directory names that mark third-party code which must load before application code.
pub const LIBRARY_MARKERS: &[&str] = &["lib", "node_modules", "bower_components"];

/// Classifies source paths as library or application files.
///
/// Classification is purely path based: a file is a library when one of its parent
/// directories is literally named after a marker. There is no dependency analysis
/// between files.
#[derive(Debug, Clone)]
pub struct PathClassifier {
  markers: Vec<String>,
}

impl Default for PathClassifier {
  fn default() -> Self {
    Self::new(LIBRARY_MARKERS.iter().copied())
  }
}

impl PathClassifier {
  /// Create a classifier for a custom set of directory markers.
  pub fn new<I, S>(markers: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      markers: markers.into_iter().map(Into::into).collect(),
    }
  }

  /// Returns `true` when any parent directory of `path` is a library marker.
  pub fn is_library(&self, path: &Path) -> bool {
    let Some(parent) = path.parent() else {
      return false;
    };

    parent.components().any(|component| match component {
      Component::Normal(segment) => segment
        .to_str()
        .is_some_and(|name| self.markers.iter().any(|marker| marker == name)),
      _ => false,
    })
  }

  /// Glob patterns matching every file below a library directory.
  pub fn exclusion_patterns(&self) -> Vec<String> {
    self
      .markers
      .iter()
      .map(|marker| format!("**/{marker}/**"))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn recognises_library_directories() {
    let classifier = PathClassifier::default();
    assert!(classifier.is_library(Path::new("/tmp/lib/c.js")));
    assert!(classifier.is_library(Path::new("/tmp/web/node_modules/x/index.js")));
    assert!(classifier.is_library(Path::new("bower_components/y.js")));
  }

  #[test]
  fn ignores_partial_segment_matches() {
    let classifier = PathClassifier::default();
    assert!(!classifier.is_library(Path::new("/tmp/a.js")));
    assert!(!classifier.is_library(Path::new("/tmp/library/a.js")));
    assert!(!classifier.is_library(Path::new("/tmp/mylib/a.js")));
    assert!(!classifier.is_library(Path::new("/tmp/web/lib")));
  }

  #[test]
  fn builds_recursive_exclusion_patterns() {
    let classifier = PathClassifier::new(["vendor"]);
    assert_eq!(classifier.exclusion_patterns(), vec!["**/vendor/**".to_string()]);
  }
}
