//! Writing generated files so that a failed run never leaves a half-written output behind.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use same_file::is_same_file;
use tempfile::NamedTempFile;

use crate::config::Charset;
use crate::error::{BundleError, BundleResult};

/// Create the parent directories of `output` and remove any stale file at that path.
pub fn prepare_output_file(output: &Path) -> BundleResult<()> {
  if let Some(parent) = output.parent() {
    fs::create_dir_all(parent).map_err(|err| BundleError::io(parent, err))?;
  }

  match fs::remove_file(output) {
    Ok(()) => Ok(()),
    Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
    Err(err) => Err(BundleError::io(output, err)),
  }
}

/// Replace `output` with `bytes`, writing through a temporary sibling that is renamed into place.
pub fn write_atomically(output: &Path, bytes: &[u8]) -> BundleResult<()> {
  prepare_output_file(output)?;
  let parent = output
    .parent()
    .filter(|parent| !parent.as_os_str().is_empty())
    .unwrap_or(Path::new("."));

  let mut temp = NamedTempFile::new_in(parent).map_err(|err| BundleError::io(parent, err))?;
  if let Err(err) = temp.write_all(bytes).and_then(|()| temp.flush()) {
    return Err(BundleError::io(output, err));
  }
  temp
    .persist(output)
    .map_err(|err| BundleError::io(output, err.error))?;
  Ok(())
}

/// Write each line followed by a newline using the configured encoding.
pub fn write_lines<S: AsRef<str>>(output: &Path, lines: &[S], charset: Charset) -> BundleResult<()> {
  let capacity = lines.iter().map(|line| line.as_ref().len() + 1).sum();
  let mut text = String::with_capacity(capacity);
  for line in lines {
    text.push_str(line.as_ref());
    text.push('\n');
  }
  write_atomically(output, &charset.encode(text))
}

/// Read a text file with the configured encoding.
pub fn read_text(path: &Path, charset: Charset) -> BundleResult<String> {
  let bytes = fs::read(path).map_err(|err| BundleError::io(path, err))?;
  charset.decode(bytes).map_err(|err| BundleError::io(path, err))
}

/// Copy `source` to `destination` byte-for-byte, reusing the destination when both already
/// refer to the same file.
pub fn install_file(source: &Path, destination: &Path) -> BundleResult<()> {
  if destination.exists()
    && is_same_file(source, destination).map_err(|err| BundleError::io(destination, err))?
  {
    return Ok(());
  }
  prepare_output_file(destination)?;

  fs::copy(source, destination)
    .map(|_| ())
    .map_err(|err| BundleError::io(source, err))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn write_lines_replaces_stale_content() -> BundleResult<()> {
    let dir = tempdir().unwrap();
    let output = dir.path().join("nested/out.txt");

    write_lines(&output, &["a", "b", "c"], Charset::Utf8)?;
    write_lines(&output, &["d"], Charset::Utf8)?;

    assert_eq!(fs::read_to_string(&output).unwrap(), "d\n");
    Ok(())
  }

  #[test]
  fn write_atomically_leaves_no_temporary_files() -> BundleResult<()> {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out.bin");
    write_atomically(&output, b"bytes")?;

    let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().flatten().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(fs::read(&output).unwrap(), b"bytes");
    Ok(())
  }

  #[test]
  fn read_text_rejects_invalid_utf8() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("latin1.js");
    fs::write(&path, [0x63, 0x61, 0x66, 0xe9]).unwrap();

    let err = read_text(&path, Charset::Utf8).unwrap_err();
    assert!(matches!(err, BundleError::Io { .. }));
  }

  #[test]
  fn install_file_copies_and_reuses_identical_destinations() -> BundleResult<()> {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source/file.txt");
    fs::create_dir_all(source.parent().unwrap()).unwrap();
    fs::write(&source, b"content").unwrap();
    let destination = dir.path().join("build/deep/file.txt");

    install_file(&source, &destination)?;
    assert_eq!(fs::read(&destination).unwrap(), b"content");

    install_file(&source, &source)?;
    assert_eq!(fs::read(&source).unwrap(), b"content");
    Ok(())
  }
}
