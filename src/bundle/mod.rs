//! Build passes that turn the web application tree into its packaged form.

pub mod archive;
pub mod concat;
pub mod output;
pub mod rewrite;
pub mod site;
pub mod sync;
