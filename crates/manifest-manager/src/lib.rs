//! Android Manifest Manager
//!
//! Reads AndroidManifest.xml files for the build tools. Library merges only
//! need the declared package name.

pub mod parser;
pub mod manifest;

pub use parser::{ManifestParser, ParseError};
pub use manifest::{is_valid_package_name, AndroidManifest};
