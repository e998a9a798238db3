//! Data structures produced while preparing a bundled web application.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Asset category a source file participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
  /// `.js` source.
  JavaScript,
  /// `.css` stylesheet.
  Css,
  /// Anything else, copied or rewritten as-is.
  Other,
}

impl AssetKind {
  /// Classify a path by its extension, ignoring case.
  pub fn from_path(path: &Path) -> Self {
    match path
      .extension()
      .and_then(|ext| ext.to_str())
      .map(str::to_ascii_lowercase)
      .as_deref()
    {
      Some("js") => Self::JavaScript,
      Some("css") => Self::Css,
      _ => Self::Other,
    }
  }

  /// File extension used for combined outputs of this kind.
  pub fn extension(self) -> Option<&'static str> {
    match self {
      Self::JavaScript => Some("js"),
      Self::Css => Some("css"),
      Self::Other => None,
    }
  }
}

/// A file discovered under the configured source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
  /// Absolute path on disk.
  pub path: PathBuf,
  /// Forward-slash path relative to the source root.
  pub relative_path: String,
  /// Asset category derived from the extension.
  pub kind: AssetKind,
  /// Whether the file sits under a library directory.
  pub is_library: bool,
}

impl SourceFile {
  /// Bare file name, used when matching references in markup.
  pub fn file_name(&self) -> &str {
    self
      .relative_path
      .rsplit('/')
      .next()
      .unwrap_or(&self.relative_path)
  }
}

/// A generated file built by concatenating several sources of the same kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedAsset {
  /// Kind shared by every source.
  pub kind: AssetKind,
  /// Location of the generated file.
  pub output: PathBuf,
  /// File name the asset is published and referenced under.
  pub published_name: String,
  /// Sources in the order they were concatenated.
  pub sources: Vec<SourceFile>,
}

impl CombinedAsset {
  /// Bare names of every source, as matched by the reference rewriter.
  pub fn source_names(&self) -> Vec<String> {
    self
      .sources
      .iter()
      .map(|source| source.file_name().to_string())
      .collect()
  }

  /// Whether `path` was folded into this asset.
  pub fn contains(&self, path: &Path) -> bool {
    self.sources.iter().any(|source| source.path == path)
  }
}

/// Summary of the copy/rewrite pass over the web application tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageReport {
  /// Files copied byte-for-byte.
  pub copied: usize,
  /// Markup files whose references were rewritten.
  pub rewritten: usize,
  /// Sources left out because they were combined.
  pub skipped: usize,
}

/// Everything produced by a full build invocation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
  /// Combined scripts, when any were produced.
  pub javascript: Option<CombinedAsset>,
  /// Combined stylesheets, when any were produced.
  pub css: Option<CombinedAsset>,
  /// Outcome of the packaging pass.
  pub package: PackageReport,
  /// Archive that was repackaged, if configured.
  pub archive: Option<PathBuf>,
  /// Directories the build output was mirrored into.
  pub synced_dirs: Vec<PathBuf>,
}
