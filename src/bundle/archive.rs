//! Repackaging of web archives so that they ship combined assets instead of their sources.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use indexmap::IndexMap;
use log::{debug, info, warn};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::asset_paths::{entry_base_name, is_foreign_absolute_path, make_archive_entry_path, relative_to};
use crate::error::{BundleError, BundleResult};

/// Ordered mapping from archive entry path to its raw contents.
///
/// Iteration order is the order entries were read or inserted in; removals keep the order
/// of the remaining entries, so rebuilding an archive from the map is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveEntryMap {
  entries: IndexMap<String, Vec<u8>>,
}

impl ArchiveEntryMap {
  /// Create an empty map.
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert or overwrite an entry. Overwriting keeps the entry's original position.
  pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
    self.entries.insert(path.into(), bytes);
  }

  /// Remove an entry, keeping the order of the others.
  pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
    self.entries.shift_remove(path)
  }

  /// Contents of an entry.
  pub fn get(&self, path: &str) -> Option<&[u8]> {
    self.entries.get(path).map(Vec::as_slice)
  }

  /// Entry paths in order.
  pub fn paths(&self) -> impl Iterator<Item = &str> {
    self.entries.keys().map(String::as_str)
  }

  /// Entries in order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
    self
      .entries
      .iter()
      .map(|(path, bytes)| (path.as_str(), bytes.as_slice()))
  }

  /// Number of entries.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Returns `true` when the map holds no entries.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// First entry whose path ends with `relative_path`, on a path segment boundary.
  ///
  /// Archives usually nest the web application below a prefix of their own, so entries
  /// are matched by suffix rather than equality.
  pub fn find_suffix(&self, relative_path: &str) -> Option<&str> {
    let relative_path = relative_path.trim_start_matches('/');
    if relative_path.is_empty() {
      return None;
    }

    self
      .paths()
      .find(|path| {
        *path == relative_path
          || path
            .strip_suffix(relative_path)
            .is_some_and(|prefix| prefix.ends_with('/'))
      })
  }
}

impl<K: Into<String>> FromIterator<(K, Vec<u8>)> for ArchiveEntryMap {
  fn from_iter<T: IntoIterator<Item = (K, Vec<u8>)>>(iter: T) -> Self {
    Self {
      entries: iter
        .into_iter()
        .map(|(path, bytes)| (path.into(), bytes))
        .collect(),
    }
  }
}

/// A generated file to be placed into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedEntry {
  /// Bare file name the entry is stored under when appended.
  pub name: String,
  /// Full contents of the file.
  pub bytes: Vec<u8>,
  /// Path relative to the build directory, used to detect an existing entry.
  pub relative_path: String,
}

impl GeneratedEntry {
  /// Load a generated file, returning `None` when it does not exist on disk.
  pub fn load(path: &Path, build_dir: &Path) -> BundleResult<Option<Self>> {
    if !path.is_file() {
      return Ok(None);
    }

    let relative_path = relative_to(path, build_dir)?;
    let bytes = fs::read(path).map_err(|err| BundleError::io(path, err))?;
    Ok(Some(Self {
      name: entry_base_name(&relative_path).to_string(),
      bytes,
      relative_path,
    }))
  }
}

/// Swap the original sources in `entries` for the generated files.
///
/// Entry names leaking another machine's absolute paths are first reduced to their base
/// name. Each source is then removed by suffix match; sources already absent are ignored.
/// Finally every generated file either overwrites the entry already holding its
/// build-relative path or is appended under its bare name.
pub fn substitute(
  entries: &mut ArchiveEntryMap,
  sources_to_remove: &[String],
  generated: &[GeneratedEntry],
) {
  normalise_entry_paths(entries);

  for source in sources_to_remove {
    match entries.find_suffix(source).map(str::to_string) {
      Some(path) => {
        debug!("removing {path} from archive");
        entries.remove(&path);
      }
      None => debug!("{source} is not part of the archive"),
    }
  }

  for file in generated {
    let target = entries
      .find_suffix(&file.relative_path)
      .map_or_else(|| file.name.clone(), str::to_string);
    debug!("storing {} as {target}", file.relative_path);
    entries.insert(target, file.bytes.clone());
  }
}

fn normalise_entry_paths(entries: &mut ArchiveEntryMap) {
  let original = std::mem::take(&mut entries.entries);
  for (path, bytes) in original {
    let normalised = if is_foreign_absolute_path(&path) {
      let mut base = entry_base_name(&path).to_string();
      if path.ends_with(['/', '\\']) {
        base.push('/');
      }
      warn!("archive entry {path} refers to an absolute path, storing it as {base}");
      base
    } else {
      make_archive_entry_path(&path)
    };

    if normalised.is_empty() {
      continue;
    }
    entries.insert(normalised, bytes);
  }
}

/// Read every entry of a zip archive. Directories become zero-byte entries ending in `/`.
pub fn read_archive(path: &Path) -> BundleResult<ArchiveEntryMap> {
  if !path.is_file() {
    return Err(BundleError::MissingRoot {
      path: path.to_path_buf(),
    });
  }

  let file = File::open(path).map_err(|err| BundleError::io(path, err))?;
  let mut archive = ZipArchive::new(file).map_err(|err| BundleError::archive(path, err))?;
  let mut entries = ArchiveEntryMap::new();

  for index in 0..archive.len() {
    let mut entry = archive
      .by_index(index)
      .map_err(|err| BundleError::archive(path, err))?;
    let name = entry.name().to_string();
    let mut bytes = Vec::new();
    if !entry.is_dir() {
      entry
        .read_to_end(&mut bytes)
        .map_err(|err| BundleError::io(path, err))?;
    }
    entries.insert(name, bytes);
  }

  Ok(entries)
}

/// Replace the archive at `path` with one holding exactly `entries`, in map order.
///
/// The archive is written to a temporary sibling first and renamed over the original, so
/// an interrupted write never leaves a truncated archive behind.
pub fn write_archive(path: &Path, entries: &ArchiveEntryMap) -> BundleResult<()> {
  let parent = path
    .parent()
    .filter(|parent| !parent.as_os_str().is_empty())
    .unwrap_or(Path::new("."));
  let mut temp = NamedTempFile::new_in(parent).map_err(|err| BundleError::io(parent, err))?;
  let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

  {
    let mut writer = ZipWriter::new(temp.as_file_mut());
    for (name, bytes) in entries.iter() {
      let name = make_archive_entry_path(name);
      if name.ends_with('/') {
        writer
          .add_directory(name, options)
          .map_err(|err| BundleError::archive(path, err))?;
      } else {
        writer
          .start_file(name, options)
          .map_err(|err| BundleError::archive(path, err))?;
        writer
          .write_all(bytes)
          .map_err(|err| BundleError::io(path, err))?;
      }
    }
    writer
      .finish()
      .map_err(|err| BundleError::archive(path, err))?
      .flush()
      .map_err(|err| BundleError::io(path, err))?;
  }

  temp
    .persist(path)
    .map_err(|err| BundleError::io(path, err.error))?;
  Ok(())
}

/// Read the archive at `path`, substitute the generated files for their sources and write
/// it back in place.
pub fn repackage_archive(
  path: &Path,
  sources_to_remove: &[String],
  generated: &[GeneratedEntry],
) -> BundleResult<ArchiveEntryMap> {
  let mut entries = read_archive(path)?;
  let before = entries.len();
  substitute(&mut entries, sources_to_remove, generated);
  write_archive(path, &entries)?;

  info!(
    "repackaged {}: {} entries before, {} after",
    path.display(),
    before,
    entries.len()
  );
  Ok(entries)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  fn map(paths: &[&str]) -> ArchiveEntryMap {
    paths
      .iter()
      .map(|path| (*path, path.as_bytes().to_vec()))
      .collect()
  }

  fn generated(name: &str, bytes: &[u8]) -> GeneratedEntry {
    GeneratedEntry {
      name: name.into(),
      bytes: bytes.to_vec(),
      relative_path: name.into(),
    }
  }

  #[test]
  fn removes_sources_and_appends_the_combined_file() {
    let mut entries = map(&[
      "META-INF/",
      "META-INF/MANIFEST.MF",
      "web/index.html",
      "web/first.js",
      "web/lib/second.js",
      "web/style.css",
    ]);

    substitute(
      &mut entries,
      &["first.js".into(), "lib/second.js".into(), "missing.js".into()],
      &[generated("combined.js", b"combined")],
    );

    let paths: Vec<&str> = entries.paths().collect();
    assert_eq!(paths, vec![
      "META-INF/",
      "META-INF/MANIFEST.MF",
      "web/index.html",
      "web/style.css",
      "combined.js",
    ]);
    assert_eq!(entries.get("combined.js"), Some(&b"combined"[..]));
  }

  #[test]
  fn existing_generated_entry_is_overwritten_in_place() {
    let mut entries = map(&["web/combined.js", "web/index.html", "web/app.js"]);

    substitute(
      &mut entries,
      &["app.js".into()],
      &[generated("combined.js", b"fresh")],
    );

    let paths: Vec<&str> = entries.paths().collect();
    assert_eq!(paths, vec!["web/combined.js", "web/index.html"]);
    assert_eq!(entries.get("web/combined.js"), Some(&b"fresh"[..]));
  }

  #[test]
  fn suffix_matching_respects_segment_boundaries() {
    let entries = map(&["web/notfirst.js", "web/first.js"]);
    assert_eq!(entries.find_suffix("first.js"), Some("web/first.js"));
    assert_eq!(entries.find_suffix(""), None);
  }

  #[test]
  fn foreign_absolute_paths_are_reduced_to_base_names() {
    let mut entries = map(&["C:\\build\\web\\index.html", "/home/dev/web/app.js", "/js/x.js"]);
    substitute(&mut entries, &[], &[]);

    let paths: Vec<&str> = entries.paths().collect();
    assert_eq!(paths, vec!["index.html", "app.js", "js/x.js"]);
  }

  #[test]
  fn relative_home_like_directories_are_kept() {
    let mut entries = map(&[
      "home/partials/header.html",
      "users/partials/header.html",
      "index.html",
    ]);
    substitute(&mut entries, &[], &[]);

    let paths: Vec<&str> = entries.paths().collect();
    assert_eq!(paths, vec![
      "home/partials/header.html",
      "users/partials/header.html",
      "index.html",
    ]);
    assert_eq!(
      entries.get("users/partials/header.html"),
      Some(&b"users/partials/header.html"[..])
    );
  }

  #[test]
  fn colliding_names_keep_a_single_entry() {
    let mut entries = map(&["/home/a/app.js", "app.js"]);
    substitute(&mut entries, &[], &[]);

    assert_eq!(entries.len(), 1);
    assert_eq!(entries.get("app.js"), Some(&b"app.js"[..]));
  }

  #[test]
  fn generated_entry_loads_relative_to_build_dir() -> BundleResult<()> {
    let dir = tempdir().unwrap();
    let build = dir.path().join("build");
    fs::create_dir_all(&build).unwrap();
    fs::write(build.join("combined.js"), "js").unwrap();

    let entry = GeneratedEntry::load(&build.join("combined.js"), &build)?.unwrap();
    assert_eq!(entry.name, "combined.js");
    assert_eq!(entry.relative_path, "combined.js");
    assert_eq!(entry.bytes, b"js");

    assert!(GeneratedEntry::load(&build.join("absent.js"), &build)?.is_none());
    Ok(())
  }

  #[test]
  fn extract_and_recreate_preserves_entries() -> BundleResult<()> {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sample.war");
    let original = map(&["WEB-INF/", "WEB-INF/web.xml", "index.html", "js/app.js"]);
    let original = original
      .iter()
      .map(|(name, bytes)| {
        let bytes = if name.ends_with('/') { Vec::new() } else { bytes.to_vec() };
        (name.to_string(), bytes)
      })
      .collect::<ArchiveEntryMap>();

    write_archive(&path, &original)?;
    let reread = read_archive(&path)?;
    assert_eq!(reread, original);

    let repackaged = repackage_archive(&path, &[], &[])?;
    assert_eq!(repackaged, original);
    assert_eq!(read_archive(&path)?, original);
    Ok(())
  }

  #[test]
  fn missing_archives_are_reported() {
    let dir = tempdir().unwrap();
    let err = read_archive(&dir.path().join("absent.war")).unwrap_err();
    assert!(matches!(err, BundleError::MissingRoot { .. }));
  }
}
