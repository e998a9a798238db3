//! Rewriting of markup so that references to combined sources point at the combined file.
//!
//! Matching is line based and uses bare file names, not full relative paths: two distinct
//! sources sharing a name in different directories are indistinguishable here, and a
//! reference to either is treated as a reference to the combined file.

use std::collections::HashSet;

use crate::models::{AssetKind, CombinedAsset};

/// Kind of tag a rewritten line holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceTag {
  /// `<script src="...">`.
  Script,
  /// `<link rel="stylesheet" href="...">`.
  Stylesheet,
}

/// Source names mapped to the single file replacing them. Built fresh for every pass.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
  source_names: Vec<String>,
  replacement: String,
}

impl ReferenceTable {
  /// Create a table mapping every name in `source_names` to `replacement`.
  pub fn new<I, S>(source_names: I, replacement: impl Into<String>) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut seen = HashSet::new();
    let source_names = source_names
      .into_iter()
      .map(|name| name.as_ref().to_lowercase())
      .filter(|name| !name.is_empty())
      .filter(|name| seen.insert(name.clone()))
      .collect();

    Self {
      source_names,
      replacement: replacement.into(),
    }
  }

  /// Table for the sources of a combined asset.
  pub fn from_asset(asset: &CombinedAsset) -> Self {
    Self::new(asset.source_names(), asset.published_name.as_str())
  }

  /// Returns `true` when no source would ever match.
  pub fn is_empty(&self) -> bool {
    self.source_names.is_empty()
  }

  /// Determine whether `line` references one of the known sources.
  pub fn classify(&self, line: &str) -> Option<ReferenceTag> {
    let trimmed = line.trim_start();
    let tag = if trimmed.starts_with("<script ") && line.contains(" src=\"") {
      ReferenceTag::Script
    } else if trimmed.starts_with("<link ")
      && line.contains("rel=\"stylesheet\"")
      && line.contains(" href=\"")
    {
      ReferenceTag::Stylesheet
    } else {
      return None;
    };

    let lowered = line.to_lowercase();
    self
      .source_names
      .iter()
      .any(|name| lowered.contains(name.as_str()))
      .then_some(tag)
  }

  /// Canonical line that replaces every matching reference of the given kind.
  pub fn replacement_line(&self, tag: ReferenceTag) -> String {
    match tag {
      ReferenceTag::Script => format!("<script src=\"{}\"></script>", self.replacement),
      ReferenceTag::Stylesheet => {
        format!("<link rel=\"stylesheet\" href=\"{}\" />", self.replacement)
      }
    }
  }

  /// Rewrite a document. Matching lines are replaced by the canonical reference; once a
  /// canonical reference has been emitted, later matches of the same kind are dropped.
  pub fn rewrite<S: AsRef<str>>(&self, lines: &[S]) -> Vec<String> {
    let mut emitted = HashSet::new();
    let mut rewritten = Vec::with_capacity(lines.len());

    for line in lines {
      let line = line.as_ref();
      match self.classify(line) {
        Some(tag) => {
          if emitted.insert(tag) {
            rewritten.push(self.replacement_line(tag));
          }
        }
        None => rewritten.push(line.to_string()),
      }
    }

    rewritten
  }
}

/// Rewrite `lines` so that references to any of `source_names` collapse into a single
/// reference to `replacement`.
pub fn rewrite_references<S, N>(lines: &[S], source_names: &[N], replacement: &str) -> Vec<String>
where
  S: AsRef<str>,
  N: AsRef<str>,
{
  ReferenceTable::new(source_names, replacement).rewrite(lines)
}

/// Returns `true` for markup files whose references are rewritten while packaging.
pub fn is_markup(relative_path: &str, kind: AssetKind) -> bool {
  if kind != AssetKind::Other {
    return false;
  }
  let lowered = relative_path.to_ascii_lowercase();
  lowered.ends_with(".html") || lowered.ends_with(".htm")
}
