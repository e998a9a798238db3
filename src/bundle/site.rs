//! Packaging of the web application tree into the build directory.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::bundle::output::{install_file, read_text, write_lines};
use crate::bundle::rewrite::{ReferenceTable, is_markup};
use crate::config::Charset;
use crate::error::{BundleError, BundleResult};
use crate::models::{CombinedAsset, PackageReport, SourceFile};

/// Mirror `files` into `build_dir`.
///
/// Markup is rewritten so that references to combined sources point at the combined files,
/// sources folded into a combined asset are left out, and everything else is copied as-is.
/// Files previously in `build_dir` are removed first, except the combined outputs.
pub fn package_web_app(
  build_dir: &Path,
  files: &[SourceFile],
  combined: &[&CombinedAsset],
  charset: Charset,
) -> BundleResult<PackageReport> {
  let keep: BTreeSet<PathBuf> = combined
    .iter()
    .filter_map(|asset| asset.output.strip_prefix(build_dir).ok())
    .map(Path::to_path_buf)
    .collect();
  clean_build_dir(build_dir, &keep)?;

  let tables: Vec<ReferenceTable> = combined
    .iter()
    .map(|asset| ReferenceTable::from_asset(asset))
    .filter(|table| !table.is_empty())
    .collect();

  let mut report = PackageReport::default();
  for file in files {
    let destination = build_dir.join(&file.relative_path);

    if is_markup(&file.relative_path, file.kind) {
      rewrite_markup_file(&file.path, &destination, &tables, charset)?;
      report.rewritten += 1;
    } else if combined.iter().any(|asset| asset.contains(&file.path)) {
      debug!("skipping combined source {}", file.relative_path);
      report.skipped += 1;
    } else {
      install_file(&file.path, &destination)?;
      report.copied += 1;
    }
  }

  info!(
    "packaged {} into {}: {} copied, {} rewritten, {} combined",
    files.len(),
    build_dir.display(),
    report.copied,
    report.rewritten,
    report.skipped
  );
  Ok(report)
}

/// Rewrite one markup file through every reference table, writing the result to `destination`.
pub fn rewrite_markup_file(
  source: &Path,
  destination: &Path,
  tables: &[ReferenceTable],
  charset: Charset,
) -> BundleResult<()> {
  let contents = read_text(source, charset)?;
  let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();
  for table in tables {
    lines = table.rewrite(&lines);
  }
  write_lines(destination, &lines, charset)
}

/// Remove every file below `root` whose root-relative path is not in `keep`, pruning
/// directories left empty. A missing root is created.
pub fn clean_build_dir(root: &Path, keep: &BTreeSet<PathBuf>) -> BundleResult<()> {
  if !root.exists() {
    return fs::create_dir_all(root).map_err(|err| BundleError::io(root, err));
  }

  prune_subtree(root, Path::new(""), keep)?;
  Ok(())
}

fn prune_subtree(root: &Path, relative: &Path, keep: &BTreeSet<PathBuf>) -> BundleResult<bool> {
  let current_path = if relative.as_os_str().is_empty() {
    root.to_path_buf()
  } else {
    root.join(relative)
  };

  let mut has_kept_descendants = false;
  let entries = match fs::read_dir(&current_path) {
    Ok(entries) => entries,
    Err(err) if err.kind() == ErrorKind::NotFound => return Ok(true),
    Err(err) => return Err(BundleError::io(&current_path, err)),
  };

  for entry in entries {
    let entry = entry.map_err(|err| BundleError::io(&current_path, err))?;
    let child_relative = relative.join(entry.file_name());
    let entry_path = entry.path();
    let file_type = entry
      .file_type()
      .map_err(|err| BundleError::io(&entry_path, err))?;

    if file_type.is_dir() {
      if prune_subtree(root, &child_relative, keep)? {
        fs::remove_dir_all(&entry_path).map_err(|err| BundleError::io(&entry_path, err))?;
      } else {
        has_kept_descendants = true;
      }
    } else if keep.contains(&child_relative) {
      has_kept_descendants = true;
    } else {
      fs::remove_file(&entry_path).map_err(|err| BundleError::io(&entry_path, err))?;
    }
  }

  Ok(!has_kept_descendants && !relative.as_os_str().is_empty())
}
