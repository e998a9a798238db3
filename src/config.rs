//! Project configuration describing where the web application lives and how it is bundled.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use crate::error::{BundleError, BundleResult};
use crate::models::AssetKind;

/// File name searched for in the project directory when no explicit config is given.
pub const DEFAULT_CONFIG_FILE: &str = "webapp.config.json";

/// Discoverable configuration, as authored by the user.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WebAppConfig {
  /// Directory holding the web application sources, relative to the project.
  pub source_dir: String,
  /// Directory the packaged application is written to, relative to the project.
  pub build_dir: String,
  /// Project name used to derive default output names. Defaults to the project directory name.
  pub project_name: Option<String>,
  /// Build identifier used to derive default output names. Generated per run when absent.
  pub build_id: Option<String>,
  /// Explicit name of the combined JavaScript file.
  pub combined_java_script_file_name: Option<String>,
  /// Explicit name of the combined stylesheet.
  pub combined_css_file_name: Option<String>,
  /// Whether scripts are concatenated into a single file.
  pub combine_java_script: bool,
  /// Whether stylesheets are concatenated into a single file.
  pub combine_css: bool,
  /// Whether scripts under library directories take part in combination.
  pub combine_libraries: bool,
  /// Glob patterns excluded from every pass.
  pub excludes: Vec<String>,
  /// Glob patterns excluded from script combination only.
  pub java_script_excludes: Vec<String>,
  /// Glob patterns excluded from stylesheet combination only.
  pub css_excludes: Vec<String>,
  /// Regex replacements applied to every combined script line.
  pub java_script_line_replacements: Vec<LineReplacement>,
  /// Text encoding of sources and outputs.
  pub charset: String,
  /// Directories the packaged application is mirrored into after a build.
  pub sync_dirs: Vec<String>,
  /// Web archive whose sources are replaced by the combined files.
  pub archive: Option<String>,
}

/// A single regex based rewrite applied to combined script lines.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LineReplacement {
  /// Regular expression matched against each line.
  pub pattern: String,
  /// Replacement text, supporting `$1` style group references.
  pub replacement: String,
}

impl Default for WebAppConfig {
  fn default() -> Self {
    Self {
      source_dir: "web".into(),
      build_dir: "build/web".into(),
      project_name: None,
      build_id: None,
      combined_java_script_file_name: None,
      combined_css_file_name: None,
      combine_java_script: true,
      combine_css: false,
      combine_libraries: false,
      excludes: Vec::new(),
      java_script_excludes: Vec::new(),
      css_excludes: Vec::new(),
      java_script_line_replacements: Vec::new(),
      charset: "UTF-8".into(),
      sync_dirs: Vec::new(),
      archive: None,
    }
  }
}

impl WebAppConfig {
  /// Attempt to load configuration from the provided project directory.
  ///
  /// A missing configuration file yields the defaults; a file that exists but cannot be
  /// read or parsed is reported, since silently ignoring it would bundle the wrong tree.
  pub fn discover(project_dir: &Path) -> BundleResult<Self> {
    let candidate = project_dir.join(DEFAULT_CONFIG_FILE);
    if !candidate.exists() {
      return Ok(Self::default());
    }
    Self::from_path(&candidate)
  }

  /// Read configuration from a specific JSON file.
  pub fn from_path(path: &Path) -> BundleResult<Self> {
    let content = fs::read_to_string(path).map_err(|err| BundleError::io(path, err))?;
    serde_json::from_str(&content).map_err(|err| {
      BundleError::configuration(format!("failed to parse {}: {err}", path.display()))
    })
  }

  /// Compute every derived value once, producing the configuration used by a build pass.
  pub fn resolve(&self, project_dir: &Path) -> BundleResult<ResolvedConfig> {
    let charset = Charset::parse(&self.charset).ok_or_else(|| {
      BundleError::configuration(format!("unsupported charset '{}'", self.charset))
    })?;

    let project_name = self
      .project_name
      .clone()
      .filter(|name| !name.trim().is_empty())
      .or_else(|| {
        project_dir
          .file_name()
          .map(|name| name.to_string_lossy().into_owned())
      })
      .unwrap_or_else(|| "webapp".to_string());
    let build_id = self
      .build_id
      .clone()
      .filter(|id| !id.trim().is_empty())
      .unwrap_or_else(generate_build_id);

    let combined_js_name = default_combined_name(
      self.combined_java_script_file_name.as_deref(),
      &project_name,
      &build_id,
      AssetKind::JavaScript,
    );
    let combined_css_name = default_combined_name(
      self.combined_css_file_name.as_deref(),
      &project_name,
      &build_id,
      AssetKind::Css,
    );

    for name in [&combined_js_name, &combined_css_name] {
      if name.contains(['/', '\\']) {
        return Err(BundleError::configuration(format!(
          "combined file name '{name}' must not contain a directory"
        )));
      }
    }

    let mut line_replacements = Vec::with_capacity(self.java_script_line_replacements.len());
    for replacement in &self.java_script_line_replacements {
      let pattern = regex::Regex::new(&replacement.pattern).map_err(|err| {
        BundleError::configuration(format!(
          "invalid line replacement pattern '{}': {err}",
          replacement.pattern
        ))
      })?;
      line_replacements.push((pattern, replacement.replacement.clone()));
    }

    Ok(ResolvedConfig {
      project_dir: project_dir.to_path_buf(),
      source_dir: project_dir.join(&self.source_dir),
      build_dir: project_dir.join(&self.build_dir),
      project_name,
      build_id,
      combined_js_name,
      combined_css_name,
      combine_javascript: self.combine_java_script,
      combine_css: self.combine_css,
      combine_libraries: self.combine_libraries,
      excludes: self.excludes.clone(),
      javascript_excludes: self.java_script_excludes.clone(),
      css_excludes: self.css_excludes.clone(),
      line_replacements,
      charset,
      sync_dirs: self
        .sync_dirs
        .iter()
        .map(|dir| project_dir.join(dir))
        .collect(),
      archive: self.archive.as_ref().map(|archive| project_dir.join(archive)),
    })
  }
}

/// Text encodings supported for reading sources and writing outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Charset {
  /// UTF-8, the only encoding web tooling can rely on.
  #[default]
  Utf8,
}

impl Charset {
  /// Parse a charset name, ignoring case and the optional dash.
  pub fn parse(name: &str) -> Option<Self> {
    match name.trim().to_ascii_lowercase().as_str() {
      "utf-8" | "utf8" => Some(Self::Utf8),
      _ => None,
    }
  }

  /// Decode file contents.
  pub fn decode(self, bytes: Vec<u8>) -> std::io::Result<String> {
    match self {
      Self::Utf8 => String::from_utf8(bytes)
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err)),
    }
  }

  /// Encode text for writing.
  pub fn encode(self, text: String) -> Vec<u8> {
    match self {
      Self::Utf8 => text.into_bytes(),
    }
  }
}

/// Configuration resolved once at the start of a build pass. Never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
  /// Directory all relative settings were resolved against.
  pub project_dir: PathBuf,
  /// Absolute source root.
  pub source_dir: PathBuf,
  /// Absolute build output directory.
  pub build_dir: PathBuf,
  /// Project name used for default output names.
  pub project_name: String,
  /// Identifier of this build.
  pub build_id: String,
  /// File name of the combined script.
  pub combined_js_name: String,
  /// File name of the combined stylesheet.
  pub combined_css_name: String,
  /// Whether scripts are combined.
  pub combine_javascript: bool,
  /// Whether stylesheets are combined.
  pub combine_css: bool,
  /// Whether library scripts are combined too.
  pub combine_libraries: bool,
  /// User excludes applied to every pass.
  pub excludes: Vec<String>,
  /// Script specific excludes.
  pub javascript_excludes: Vec<String>,
  /// Stylesheet specific excludes.
  pub css_excludes: Vec<String>,
  /// Compiled regex rewrites for combined script lines.
  pub line_replacements: Vec<(regex::Regex, String)>,
  /// Encoding of sources and outputs.
  pub charset: Charset,
  /// Absolute mirror directories.
  pub sync_dirs: Vec<PathBuf>,
  /// Absolute path of the archive to repackage.
  pub archive: Option<PathBuf>,
}

impl ResolvedConfig {
  /// Location of the combined script.
  pub fn combined_js_path(&self) -> PathBuf {
    self.build_dir.join(&self.combined_js_name)
  }

  /// Location of the combined stylesheet.
  pub fn combined_css_path(&self) -> PathBuf {
    self.build_dir.join(&self.combined_css_name)
  }
}

/// Name a combined output, preferring the explicit value and otherwise deriving
/// `<project>-<build>.<ext>`.
pub fn default_combined_name(
  explicit: Option<&str>,
  project_name: &str,
  build_id: &str,
  kind: AssetKind,
) -> String {
  if let Some(name) = explicit.map(str::trim).filter(|name| !name.is_empty()) {
    return name.to_string();
  }

  let extension = kind.extension().unwrap_or("txt");
  format!("{project_name}-{build_id}.{extension}")
}

fn generate_build_id() -> String {
  let millis = SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|elapsed| elapsed.as_millis())
    .unwrap_or_default();
  format!("{millis:x}")
}
