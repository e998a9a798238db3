//! Typed failures raised while resolving, combining and rewriting web application assets.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result alias used by every bundling stage.
pub type BundleResult<T> = Result<T, BundleError>;

/// Error raised by a line filter supplied by the caller.
pub type FilterError = Box<dyn std::error::Error + Send + Sync>;

/// Failures surfaced to the caller. Variants concerning a file always carry its path.
#[derive(Debug, Error)]
pub enum BundleError {
  /// Invalid or unsupported configuration value.
  #[error("invalid configuration: {message}")]
  Configuration {
    /// Description of the offending setting.
    message: String,
  },

  /// A configured root directory or input file does not exist.
  #[error("{} does not exist", path.display())]
  MissingRoot {
    /// Path that was expected to exist.
    path: PathBuf,
  },

  /// A file resolved outside the directory it was declared under.
  #[error("{} is located outside of {}", path.display(), root.display())]
  PathOutsideRoot {
    /// Offending file.
    path: PathBuf,
    /// Directory the file should have been inside.
    root: PathBuf,
  },

  /// Reading or writing a file failed.
  #[error("I/O failure on {}: {source}", path.display())]
  Io {
    /// File or directory being accessed.
    path: PathBuf,
    /// Underlying I/O error.
    source: std::io::Error,
  },

  /// The caller supplied line filter rejected a line.
  #[error("line filter failed on {}:{line}: {source}", path.display())]
  Filter {
    /// Source file the line came from.
    path: PathBuf,
    /// One-based line number within the source file.
    line: usize,
    /// Error returned by the filter.
    source: FilterError,
  },

  /// An include or exclude glob could not be compiled.
  #[error("invalid pattern '{pattern}': {source}")]
  Pattern {
    /// Pattern text as configured.
    pattern: String,
    /// Underlying glob error.
    source: globset::Error,
  },

  /// Reading or writing an archive container failed.
  #[error("archive failure on {}: {source}", path.display())]
  Archive {
    /// Archive file being processed.
    path: PathBuf,
    /// Underlying zip error.
    source: zip::result::ZipError,
  },
}

impl BundleError {
  /// Build a configuration error from any displayable message.
  pub fn configuration(message: impl Into<String>) -> Self {
    Self::Configuration {
      message: message.into(),
    }
  }

  /// Wrap an I/O error with the path it occurred on.
  pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.as_ref().to_path_buf(),
      source,
    }
  }

  /// Wrap a zip error with the archive it occurred on.
  pub fn archive(path: impl AsRef<Path>, source: zip::result::ZipError) -> Self {
    Self::Archive {
      path: path.as_ref().to_path_buf(),
      source,
    }
  }
}
