//! Helpers for classifying and normalising the paths of web application assets.
//!
//! Every stage of the bundler goes through these to decide whether a file belongs to a
//! library and what it is called relative to its root or inside an archive.

mod bundle;
mod classify;
mod filters;
mod relative;

pub use bundle::{entry_base_name, make_archive_entry_path};
pub use classify::{LIBRARY_MARKERS, PathClassifier};
pub use filters::is_foreign_absolute_path;
pub use relative::relative_to;
