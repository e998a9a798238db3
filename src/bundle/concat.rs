//! Concatenation of source files into a single combined asset.

use std::path::Path;

use log::debug;
use regex::Regex;

use crate::bundle::output::{read_text, write_lines};
use crate::config::Charset;
use crate::error::{BundleError, BundleResult, FilterError};

/// Rewrites a single line of a combined file.
///
/// Filters transform lines, they never remove them: an empty result still produces an
/// empty line in the output.
pub trait LineFilter {
  /// Return the replacement for `line`.
  fn transform(&self, line: &str) -> Result<String, FilterError>;
}

impl<F> LineFilter for F
where
  F: Fn(&str) -> Result<String, FilterError>,
{
  fn transform(&self, line: &str) -> Result<String, FilterError> {
    self(line)
  }
}

/// Line filter applying a list of regex replacements in order.
#[derive(Debug, Clone, Default)]
pub struct RegexLineFilter {
  replacements: Vec<(Regex, String)>,
}

impl RegexLineFilter {
  /// Create a filter from compiled patterns and their replacement text.
  pub fn new(replacements: Vec<(Regex, String)>) -> Self {
    Self { replacements }
  }

  /// Returns `true` when the filter would leave every line untouched.
  pub fn is_empty(&self) -> bool {
    self.replacements.is_empty()
  }
}

impl LineFilter for RegexLineFilter {
  fn transform(&self, line: &str) -> Result<String, FilterError> {
    let mut current = line.to_string();
    for (pattern, replacement) in &self.replacements {
      current = pattern
        .replace_all(&current, replacement.as_str())
        .into_owned();
    }
    Ok(current)
  }
}

/// Concatenate `files` into `output`, separating (and terminating) each file's lines with
/// one empty line.
///
/// Nothing is written, and no directory created, when `files` is empty; the return value
/// tells whether an output was produced. Every line is read and filtered before the output
/// is touched, so a failing filter or unreadable source leaves no partial file.
pub fn concatenate<P: AsRef<Path>>(
  files: &[P],
  output: &Path,
  charset: Charset,
  filter: Option<&dyn LineFilter>,
) -> BundleResult<bool> {
  if files.is_empty() {
    return Ok(false);
  }

  let mut lines = Vec::new();
  for file in files {
    let file = file.as_ref();
    let contents = read_text(file, charset)?;
    for (index, line) in contents.lines().enumerate() {
      let line = match filter {
        Some(filter) => filter
          .transform(line)
          .map_err(|source| BundleError::Filter {
            path: file.to_path_buf(),
            line: index + 1,
            source,
          })?,
        None => line.to_string(),
      };
      lines.push(line);
    }
    // Separator lines are emitted as-is and never reach the filter.
    lines.push(String::new());
  }

  debug!(
    "writing {} line(s) from {} file(s) to {}",
    lines.len(),
    files.len(),
    output.display()
  );
  write_lines(output, &lines, charset)?;
  Ok(true)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::fs;
  use std::path::PathBuf;
  use tempfile::tempdir;

  fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
  }

  fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
      .unwrap()
      .lines()
      .map(str::to_string)
      .collect()
  }

  #[test]
  fn separates_and_terminates_files_with_blank_lines() -> BundleResult<()> {
    let dir = tempdir().unwrap();
    let first = write(dir.path(), "first.css", "first\n1");
    let second = write(dir.path(), "second.css", "second\n2");
    let combined = dir.path().join("combined.css");

    assert!(concatenate(&[first, second], &combined, Charset::Utf8, None)?);
    assert_eq!(read_lines(&combined), vec!["first", "1", "", "second", "2", ""]);
    Ok(())
  }

  #[test]
  fn empty_input_writes_nothing() -> BundleResult<()> {
    let dir = tempdir().unwrap();
    let combined = dir.path().join("build/combined.js");

    let files: [PathBuf; 0] = [];
    assert!(!concatenate(&files, &combined, Charset::Utf8, None)?);
    assert!(!combined.exists());
    assert!(!dir.path().join("build").exists());
    Ok(())
  }

  #[test]
  fn applies_filter_to_every_line() -> BundleResult<()> {
    let dir = tempdir().unwrap();
    let source = write(dir.path(), "a.js", "first\nsecond\nthird\n");
    let combined = dir.path().join("combined.js");
    let filter = |line: &str| -> Result<String, FilterError> {
      Ok(if line == "second" { "2".into() } else { line.into() })
    };

    concatenate(&[source], &combined, Charset::Utf8, Some(&filter))?;
    assert_eq!(read_lines(&combined), vec!["first", "2", "third", ""]);
    Ok(())
  }

  #[test]
  fn filters_cannot_delete_lines() -> BundleResult<()> {
    let dir = tempdir().unwrap();
    let source = write(dir.path(), "a.js", "debugger;\nrun();");
    let combined = dir.path().join("combined.js");
    let filter = |line: &str| -> Result<String, FilterError> {
      Ok(if line == "debugger;" { String::new() } else { line.into() })
    };

    concatenate(&[source], &combined, Charset::Utf8, Some(&filter))?;
    assert_eq!(read_lines(&combined), vec!["", "run();", ""]);
    Ok(())
  }

  #[test]
  fn failing_filter_leaves_previous_output_untouched() {
    let dir = tempdir().unwrap();
    let source = write(dir.path(), "a.js", "ok\nboom\n");
    let combined = write(dir.path(), "combined.js", "previous build\n");
    let filter = |line: &str| -> Result<String, FilterError> {
      if line == "boom" {
        Err("refusing to rewrite".into())
      } else {
        Ok(line.into())
      }
    };

    let err = concatenate(&[source.clone()], &combined, Charset::Utf8, Some(&filter)).unwrap_err();
    match err {
      BundleError::Filter { path, line, .. } => {
        assert_eq!(path, source);
        assert_eq!(line, 2);
      }
      other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read_to_string(&combined).unwrap(), "previous build\n");
  }

  #[test]
  fn missing_source_is_reported_with_its_path() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.js");
    let err = concatenate(
      &[missing.clone()],
      &dir.path().join("out.js"),
      Charset::Utf8,
      None,
    )
    .unwrap_err();
    assert!(matches!(err, BundleError::Io { path, .. } if path == missing));
  }

  #[test]
  fn repeated_runs_replace_instead_of_append() -> BundleResult<()> {
    let dir = tempdir().unwrap();
    let source = write(dir.path(), "a.js", "a");
    let combined = dir.path().join("out/combined.js");

    concatenate(&[&source], &combined, Charset::Utf8, None)?;
    concatenate(&[&source], &combined, Charset::Utf8, None)?;
    assert_eq!(fs::read_to_string(&combined).unwrap(), "a\n\n");
    Ok(())
  }

  #[test]
  fn regex_filter_applies_replacements_in_order() {
    let filter = RegexLineFilter::new(vec![
      (Regex::new(r"DEBUG\s*=\s*true").unwrap(), "DEBUG = false".into()),
      (Regex::new(r"@VERSION@").unwrap(), "1.2.0".into()),
    ]);
    assert_eq!(
      filter.transform("var DEBUG=true; // @VERSION@").unwrap(),
      "var DEBUG = false; // 1.2.0"
    );
    assert!(!filter.is_empty());
  }
}
