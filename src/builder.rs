//! Build orchestrator running the combine, package, repackage and sync passes in order.

use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{info, warn};

use crate::bundle::archive::{self, ArchiveEntryMap, GeneratedEntry};
use crate::bundle::concat::{LineFilter, RegexLineFilter, concatenate};
use crate::bundle::site::package_web_app;
use crate::bundle::sync::sync_build_dir;
use crate::config::ResolvedConfig;
use crate::error::{BundleResult, FilterError};
use crate::models::{AssetKind, BuildReport, CombinedAsset, PackageReport, SourceFile};
use crate::ordering::order_javascript_files;
use crate::selection::{FileSetKind, FileSetResolver, FileSource, WalkDirSource};

/// High-level helper running the bundling passes for one resolved configuration.
pub struct WebAppBuilder<S: FileSource = WalkDirSource> {
  config: ResolvedConfig,
  resolver: FileSetResolver<S>,
  line_filter: Option<Box<dyn LineFilter>>,
}

impl WebAppBuilder<WalkDirSource> {
  /// Create a builder discovering files on disk.
  pub fn new(config: ResolvedConfig) -> Self {
    Self::with_source(config, WalkDirSource)
  }
}

impl<S: FileSource> WebAppBuilder<S> {
  /// Create a builder discovering files through `source`.
  pub fn with_source(config: ResolvedConfig, source: S) -> Self {
    let resolver = FileSetResolver::new(&config, source);
    Self {
      config,
      resolver,
      line_filter: None,
    }
  }

  /// Apply `filter` to every line of the combined script, after the configured replacements.
  pub fn with_line_filter(mut self, filter: impl LineFilter + 'static) -> Self {
    self.line_filter = Some(Box::new(filter));
    self
  }

  /// Configuration the builder was created for.
  pub fn config(&self) -> &ResolvedConfig {
    &self.config
  }

  /// Concatenate the combinable scripts, libraries first, into the combined script.
  ///
  /// Returns `None` when combining is disabled or no script qualifies.
  pub fn combine_javascript(&self) -> BundleResult<Option<CombinedAsset>> {
    let files = order_javascript_files(self.resolver.resolve(FileSetKind::CombinableJavaScript)?);

    let replacements = RegexLineFilter::new(self.config.line_replacements.clone());
    let chained = |line: &str| -> Result<String, FilterError> {
      let line = replacements.transform(line)?;
      match &self.line_filter {
        Some(filter) => filter.transform(&line),
        None => Ok(line),
      }
    };
    let filter: Option<&dyn LineFilter> = if replacements.is_empty() && self.line_filter.is_none() {
      None
    } else {
      Some(&chained as &dyn LineFilter)
    };

    self.combine(
      files,
      AssetKind::JavaScript,
      self.config.combined_js_path(),
      &self.config.combined_js_name,
      filter,
    )
  }

  /// Concatenate the combinable stylesheets, in discovery order, into the combined stylesheet.
  pub fn combine_css(&self) -> BundleResult<Option<CombinedAsset>> {
    let files = self.resolver.resolve(FileSetKind::CombinableCss)?;
    self.combine(
      files,
      AssetKind::Css,
      self.config.combined_css_path(),
      &self.config.combined_css_name,
      None,
    )
  }

  fn combine(
    &self,
    files: Vec<SourceFile>,
    kind: AssetKind,
    output: PathBuf,
    published_name: &str,
    filter: Option<&dyn LineFilter>,
  ) -> BundleResult<Option<CombinedAsset>> {
    let paths: Vec<&Path> = files.iter().map(|file| file.path.as_path()).collect();
    if !concatenate(&paths, &output, self.config.charset, filter)? {
      info!("no {kind:?} sources to combine");
      return Ok(None);
    }

    info!(
      "combined {} {kind:?} file(s) into {}",
      files.len(),
      output.display()
    );
    Ok(Some(CombinedAsset {
      kind,
      output,
      published_name: published_name.to_string(),
      sources: files,
    }))
  }

  /// Mirror the web application into the build directory, pointing markup at `combined`.
  pub fn package(&self, combined: &[&CombinedAsset]) -> BundleResult<PackageReport> {
    let files = self.resolver.resolve(FileSetKind::AllWebAppFiles)?;
    package_web_app(&self.config.build_dir, &files, combined, self.config.charset)
  }

  /// Copy the build directory into every configured sync directory.
  pub fn sync(&self) -> BundleResult<Vec<PathBuf>> {
    for dir in &self.config.sync_dirs {
      sync_build_dir(&WalkDirSource, &self.config.build_dir, dir)?;
    }
    Ok(self.config.sync_dirs.clone())
  }

  /// Replace the sources of `combined` in the archive at `path` by the generated files.
  pub fn repackage_archive(
    &self,
    path: &Path,
    combined: &[&CombinedAsset],
  ) -> BundleResult<ArchiveEntryMap> {
    let removals: Vec<String> = combined
      .iter()
      .flat_map(|asset| asset.sources.iter())
      .map(|source| source.relative_path.clone())
      .collect();

    let mut generated = Vec::new();
    for asset in combined {
      if let Some(entry) = GeneratedEntry::load(&asset.output, &self.config.build_dir)? {
        generated.push(entry);
      }
    }

    archive::repackage_archive(path, &removals, &generated)
  }

  /// Run every pass: combine scripts, combine stylesheets, package, repackage the configured
  /// archive and finally sync.
  pub fn build(&self) -> anyhow::Result<BuildReport> {
    let javascript = self
      .combine_javascript()
      .context("failed to combine JavaScript sources")?;
    let css = self
      .combine_css()
      .context("failed to combine CSS sources")?;
    let combined: Vec<&CombinedAsset> = javascript.iter().chain(css.iter()).collect();

    let package = self.package(&combined).with_context(|| {
      format!(
        "failed to package {} into {}",
        self.config.source_dir.display(),
        self.config.build_dir.display()
      )
    })?;

    let archive = match &self.config.archive {
      Some(path) if path.is_file() => {
        self
          .repackage_archive(path, &combined)
          .with_context(|| format!("failed to repackage {}", path.display()))?;
        Some(path.clone())
      }
      Some(path) => {
        warn!("archive {} does not exist, skipping repackaging", path.display());
        None
      }
      None => None,
    };

    let synced_dirs = self.sync().context("failed to sync the build directory")?;

    Ok(BuildReport {
      javascript,
      css,
      package,
      archive,
      synced_dirs,
    })
  }
}
