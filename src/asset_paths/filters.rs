use regex::Regex;

fn foreign_path_markers() -> &'static [Regex] {
  use std::sync::OnceLock;

  static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
  PATTERNS
    .get_or_init(|| {
      vec![
        Regex::new(r"^[A-Za-z]:[\\/]").expect("invalid drive letter regex"),
        Regex::new(r"(?i)^/(users|home)/[^/]+/").expect("invalid home directory regex"),
        Regex::new(r"^~[\\/]").expect("invalid home shorthand regex"),
      ]
    })
    .as_slice()
}

/// Determine whether an archive entry name leaks an absolute path from another machine.
///
/// Archives built by hand (for example with `zip -r /home/dev/project/web`) record the
/// packaging machine's directory layout, which cannot be reproduced when the archive is
/// rebuilt elsewhere.
pub fn is_foreign_absolute_path(entry: &str) -> bool {
  foreign_path_markers()
    .iter()
    .any(|pattern| pattern.is_match(entry))
}
