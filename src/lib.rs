#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod asset_paths;
pub mod builder;
pub mod bundle;
pub mod config;
pub mod error;
pub mod models;
pub mod ordering;
pub mod selection;

pub use asset_paths::{PathClassifier, relative_to};
pub use builder::WebAppBuilder;
pub use bundle::concat::{LineFilter, RegexLineFilter, concatenate};
pub use bundle::rewrite::{ReferenceTable, rewrite_references};
pub use config::{ResolvedConfig, WebAppConfig};
pub use error::{BundleError, BundleResult};
pub use models::{AssetKind, BuildReport, CombinedAsset, SourceFile};
pub use selection::{FileSetKind, FileSetResolver, FileSource, WalkDirSource};
