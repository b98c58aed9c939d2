//! Android Manifest Data Structures
//!
//! The subset of AndroidManifest.xml that the build tools consume.

use serde::{Deserialize, Serialize};

/// Attributes read from the `<manifest>` element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidManifest {
    /// Package name (e.g., "com.example.app"), empty when absent
    pub package: String,
}

impl AndroidManifest {
    /// Create a manifest for a package
    pub fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
        }
    }

    /// The declared package, if present and non-empty
    pub fn package_name(&self) -> Option<&str> {
        let package = self.package.trim();
        if package.is_empty() {
            None
        } else {
            Some(package)
        }
    }
}

/// Check that `package` is a dotted sequence of Java identifiers
///
/// Generated sources use the package both as a `package` declaration and as a
/// directory path, so anything else cannot be compiled downstream.
pub fn is_valid_package_name(package: &str) -> bool {
    !package.is_empty()
        && package.split('.').all(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {
                    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
                }
                _ => false,
            }
        })
}
