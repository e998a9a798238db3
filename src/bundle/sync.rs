//! Mirroring of the packaged build directory into external deployment directories.

use std::collections::BTreeSet;
use std::path::Path;

use log::info;

use crate::asset_paths::relative_to;
use crate::bundle::output::install_file;
use crate::bundle::site::clean_build_dir;
use crate::error::{BundleError, BundleResult};
use crate::selection::FileSource;

/// Replace the contents of `sync_dir` with a copy of every file in `build_dir`.
///
/// Returns the number of files copied.
pub fn sync_build_dir<S: FileSource>(
  source: &S,
  build_dir: &Path,
  sync_dir: &Path,
) -> BundleResult<usize> {
  if !build_dir.is_dir() {
    return Err(BundleError::MissingRoot {
      path: build_dir.to_path_buf(),
    });
  }

  clean_build_dir(sync_dir, &BTreeSet::new())?;

  let files = source.files(build_dir)?;
  for file in &files {
    let relative = relative_to(file, build_dir)?;
    install_file(file, &sync_dir.join(relative))?;
  }

  info!(
    "synced {} file(s) from {} to {}",
    files.len(),
    build_dir.display(),
    sync_dir.display()
  );
  Ok(files.len())
}
