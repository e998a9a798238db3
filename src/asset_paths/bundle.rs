/// Produce the name an archive entry is stored under.
///
/// Entry names always use forward slashes and never start with `/`, regardless of the
/// native directory separator of the machine that discovered the file.
pub fn make_archive_entry_path(path: &str) -> String {
  path.replace('\\', "/").trim_start_matches('/').to_string()
}

/// Final segment of an entry path, ignoring a trailing directory slash.
pub fn entry_base_name(path: &str) -> &str {
  let trimmed = path.trim_end_matches(['/', '\\']);
  trimmed
    .rsplit(['/', '\\'])
    .next()
    .filter(|name| !name.is_empty())
    .unwrap_or(trimmed)
}
