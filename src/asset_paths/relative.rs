use std::fs;
use std::path::{Component, Path};

use crate::error::{BundleError, BundleResult};

/// Returns the path of `path` relative to `root`, using forward slashes.
///
/// The path must lie strictly inside the root. A plain comparison is tried first; when it
/// fails both paths are canonicalised and compared again, so that `..` segments, symlinks
/// and case-insensitive file systems do not produce false negatives.
pub fn relative_to(path: &Path, root: &Path) -> BundleResult<String> {
  if let Some(relative) = strict_relative(path, root) {
    return Ok(relative);
  }

  if let (Ok(canonical_path), Ok(canonical_root)) = (fs::canonicalize(path), fs::canonicalize(root))
    && let Some(relative) = strict_relative(&canonical_path, &canonical_root)
  {
    return Ok(relative);
  }

  Err(BundleError::PathOutsideRoot {
    path: path.to_path_buf(),
    root: root.to_path_buf(),
  })
}

fn strict_relative(path: &Path, root: &Path) -> Option<String> {
  let stripped = path.strip_prefix(root).ok()?;
  if stripped.as_os_str().is_empty() {
    return None;
  }

  // `..` may walk back out of the root; leave those to the canonical comparison.
  if stripped
    .components()
    .any(|component| !matches!(component, Component::Normal(_)))
  {
    return None;
  }

  Some(stripped.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn strips_root_prefix() {
    let relative = relative_to(Path::new("/tmp/web/js/app.js"), Path::new("/tmp/web")).unwrap();
    assert_eq!(relative, "js/app.js");
  }

  #[test]
  fn rejects_the_root_itself() {
    let err = relative_to(Path::new("/tmp/web"), Path::new("/tmp/web")).unwrap_err();
    assert!(matches!(err, BundleError::PathOutsideRoot { .. }));
  }

  #[test]
  fn rejects_sibling_directories_sharing_a_prefix() {
    let err = relative_to(Path::new("/tmp/webapp/a.js"), Path::new("/tmp/web")).unwrap_err();
    assert!(matches!(err, BundleError::PathOutsideRoot { .. }));
  }

  #[test]
  fn falls_back_to_canonical_paths() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("web");
    fs::create_dir_all(root.join("js")).unwrap();
    fs::write(root.join("js/app.js"), "app").unwrap();

    let dotted = dir.path().join("web/js/../js/app.js");
    let relative = relative_to(&dotted, &root).unwrap();
    assert_eq!(relative, "js/app.js");
  }

  #[test]
  fn canonical_fallback_still_rejects_outside_paths() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("web");
    fs::create_dir_all(&root).unwrap();
    fs::write(dir.path().join("outside.js"), "x").unwrap();

    let escaped = root.join("../outside.js");
    assert!(relative_to(&escaped, &root).is_err());
  }
}
