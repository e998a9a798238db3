//! Selection of the source files that take part in each bundling pass.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use log::debug;
use walkdir::WalkDir;

use crate::asset_paths::{PathClassifier, relative_to};
use crate::config::ResolvedConfig;
use crate::error::{BundleError, BundleResult};
use crate::models::{AssetKind, SourceFile};

/// Patterns that never belong in a packaged web application.
pub const DEFAULT_EXCLUDES: &[&str] = &["**/.DS_Store", "**/Thumbs.db", "**/.git/**", "**/.svn/**"];

/// Scripts that are already bundles or entry points and must not be combined again.
pub const DEFAULT_JAVASCRIPT_EXCLUDES: &[&str] = &["index.js", "*.bundle.js", "*.min.js"];

/// Stylesheets that are already minified bundles.
pub const DEFAULT_CSS_EXCLUDES: &[&str] = &["*.min.css"];

/// Supplies the concrete list of files below a root directory.
///
/// The bundler never walks the file system itself; tests inject a fixed list instead.
pub trait FileSource {
  /// Every regular file below `root`, in discovery order.
  fn files(&self, root: &Path) -> BundleResult<Vec<PathBuf>>;
}

impl<T: FileSource + ?Sized> FileSource for &T {
  fn files(&self, root: &Path) -> BundleResult<Vec<PathBuf>> {
    (**self).files(root)
  }
}

/// File source backed by a recursive directory walk, sorted by file name.
///
/// Symbolic links are followed, so linked files and linked package directories are listed
/// under the path of the link.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkDirSource;

impl FileSource for WalkDirSource {
  fn files(&self, root: &Path) -> BundleResult<Vec<PathBuf>> {
    if !root.is_dir() {
      return Err(BundleError::MissingRoot {
        path: root.to_path_buf(),
      });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
      let entry = entry.map_err(|err| {
        let path = err.path().unwrap_or(root).to_path_buf();
        BundleError::io(path, err.into())
      })?;
      if entry.file_type().is_file() {
        files.push(entry.into_path());
      }
    }
    Ok(files)
  }
}

/// Union of exclusion pattern layers. A file is excluded when any pattern matches.
/// Matching ignores case, like the include patterns.
///
/// Patterns containing a `/` are matched against the root-relative path, where `*` stays
/// within a single directory. Patterns without a `/` are additionally matched against the
/// bare file name, so `*.bundle.js` excludes bundles at any depth.
#[derive(Debug, Clone)]
pub struct ExclusionRuleSet {
  by_path: GlobSet,
  by_name: GlobSet,
}

impl ExclusionRuleSet {
  /// Compile the given layers into a single rule set.
  pub fn new<'a, L>(layers: L) -> BundleResult<Self>
  where
    L: IntoIterator<Item = &'a [String]>,
  {
    let patterns: Vec<String> = normalise_patterns(layers.into_iter().flatten().cloned());
    let mut by_path = GlobSetBuilder::new();
    let mut by_name = GlobSetBuilder::new();

    for pattern in &patterns {
      by_path.add(compile_glob(pattern)?);
      if !pattern.contains('/') {
        by_name.add(compile_glob(pattern)?);
      }
    }

    Ok(Self {
      by_path: build_set(by_path, &patterns)?,
      by_name: build_set(by_name, &patterns)?,
    })
  }

  /// Returns `true` when the root-relative path matches any pattern.
  pub fn is_excluded(&self, relative_path: &str) -> bool {
    if self.by_path.is_match(relative_path) {
      return true;
    }

    let name = relative_path.rsplit('/').next().unwrap_or(relative_path);
    self.by_name.is_match(name)
  }
}

/// The named file sets a build pass works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSetKind {
  /// Every web application file, for the copy/rewrite pass.
  AllWebAppFiles,
  /// Scripts that are concatenated into the combined script.
  CombinableJavaScript,
  /// Stylesheets that are concatenated into the combined stylesheet.
  CombinableCss,
  /// Scripts located under library directories.
  LibraryJavaScript,
}

/// Resolves file sets below the source root using layered exclusion rules.
#[derive(Debug, Clone)]
pub struct FileSetResolver<S> {
  source: S,
  root: PathBuf,
  classifier: PathClassifier,
  default_excludes: Vec<String>,
  user_excludes: Vec<String>,
  javascript_excludes: Vec<String>,
  css_excludes: Vec<String>,
  combine_javascript: bool,
  combine_css: bool,
  combine_libraries: bool,
}

impl<S: FileSource> FileSetResolver<S> {
  /// Build a resolver for the resolved configuration, discovering files through `source`.
  pub fn new(config: &ResolvedConfig, source: S) -> Self {
    let mut default_excludes: Vec<String> =
      DEFAULT_EXCLUDES.iter().map(|pattern| pattern.to_string()).collect();

    // Outputs of a previous run must never feed back into the next one.
    default_excludes.push(format!("**/{}", globset::escape(&config.combined_js_name)));
    default_excludes.push(format!("**/{}", globset::escape(&config.combined_css_name)));
    if let Ok(build_relative) = relative_to(&config.build_dir, &config.source_dir) {
      default_excludes.push(format!("{}/**", globset::escape(&build_relative)));
    }

    let mut javascript_excludes = config.javascript_excludes.clone();
    javascript_excludes.extend(DEFAULT_JAVASCRIPT_EXCLUDES.iter().map(|p| p.to_string()));
    let mut css_excludes = config.css_excludes.clone();
    css_excludes.extend(DEFAULT_CSS_EXCLUDES.iter().map(|p| p.to_string()));

    Self {
      source,
      root: config.source_dir.clone(),
      classifier: PathClassifier::default(),
      default_excludes,
      user_excludes: config.excludes.clone(),
      javascript_excludes,
      css_excludes,
      combine_javascript: config.combine_javascript,
      combine_css: config.combine_css,
      combine_libraries: config.combine_libraries,
    }
  }

  /// Replace the library classifier.
  pub fn with_classifier(mut self, classifier: PathClassifier) -> Self {
    self.classifier = classifier;
    self
  }

  /// Resolve one of the named file sets.
  pub fn resolve(&self, kind: FileSetKind) -> BundleResult<Vec<SourceFile>> {
    let library_patterns = self.classifier.exclusion_patterns();
    let (include, rules) = match kind {
      FileSetKind::AllWebAppFiles => (
        "**",
        ExclusionRuleSet::new([self.default_excludes.as_slice(), self.user_excludes.as_slice()])?,
      ),
      FileSetKind::CombinableJavaScript => {
        if !self.combine_javascript {
          return Ok(Vec::new());
        }
        let libraries: &[String] = if self.combine_libraries {
          &[]
        } else {
          &library_patterns
        };
        (
          "**/*.js",
          ExclusionRuleSet::new([
            self.default_excludes.as_slice(),
            self.user_excludes.as_slice(),
            libraries,
            self.javascript_excludes.as_slice(),
          ])?,
        )
      }
      FileSetKind::CombinableCss => {
        if !self.combine_css {
          return Ok(Vec::new());
        }
        (
          "**/*.css",
          ExclusionRuleSet::new([
            self.default_excludes.as_slice(),
            self.user_excludes.as_slice(),
            self.css_excludes.as_slice(),
            library_patterns.as_slice(),
          ])?,
        )
      }
      FileSetKind::LibraryJavaScript => (
        "**/*.js",
        ExclusionRuleSet::new([self.default_excludes.as_slice(), self.user_excludes.as_slice()])?,
      ),
    };

    let mut files = self.resolve_patterns(&[include], &rules)?;
    if kind == FileSetKind::LibraryJavaScript {
      files.retain(|file| file.is_library);
    }

    debug!("resolved {kind:?}: {} file(s)", files.len());
    Ok(files)
  }

  /// Resolve files matching any include pattern and no exclusion rule, in discovery order.
  pub fn resolve_patterns(
    &self,
    include: &[&str],
    rules: &ExclusionRuleSet,
  ) -> BundleResult<Vec<SourceFile>> {
    let include_patterns: Vec<String> = include.iter().map(|p| p.to_string()).collect();
    let mut builder = GlobSetBuilder::new();
    for pattern in &include_patterns {
      let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .case_insensitive(true)
        .build()
        .map_err(|source| BundleError::Pattern {
          pattern: pattern.clone(),
          source,
        })?;
      builder.add(glob);
    }
    let include_set = build_set(builder, &include_patterns)?;

    let mut resolved = Vec::new();
    for path in self.source.files(&self.root)? {
      let relative_path = relative_to(&path, &self.root)?;
      if !include_set.is_match(&relative_path) || rules.is_excluded(&relative_path) {
        continue;
      }

      let is_library = self.classifier.is_library(Path::new(&relative_path));
      resolved.push(SourceFile {
        kind: AssetKind::from_path(&path),
        path,
        relative_path,
        is_library,
      });
    }
    Ok(resolved)
  }
}

fn compile_glob(pattern: &str) -> BundleResult<globset::Glob> {
  GlobBuilder::new(pattern)
    .literal_separator(true)
    .case_insensitive(true)
    .build()
    .map_err(|source| BundleError::Pattern {
      pattern: pattern.to_string(),
      source,
    })
}

fn build_set(builder: GlobSetBuilder, patterns: &[String]) -> BundleResult<GlobSet> {
  builder.build().map_err(|source| BundleError::Pattern {
    pattern: patterns.join(", "),
    source,
  })
}

/// Trim patterns, drop empty ones and remove duplicates while keeping layer order.
fn normalise_patterns(values: impl IntoIterator<Item = String>) -> Vec<String> {
  let mut seen = std::collections::BTreeSet::new();
  values
    .into_iter()
    .map(|value| value.trim().to_string())
    .filter(|value| !value.is_empty())
    .filter(|value| seen.insert(value.clone()))
    .collect()
}
