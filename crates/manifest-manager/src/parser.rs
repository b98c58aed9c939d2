//! AndroidManifest.xml Parser
//!
//! Reads the package declaration from manifest files. Everything below the
//! `<manifest>` root is skipped.

use std::path::Path;
use quick_xml::Reader;
use quick_xml::events::{Event, BytesStart};
use tracing::{debug, warn};

use crate::manifest::{is_valid_package_name, AndroidManifest};

/// Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),
    #[error("Invalid manifest structure: {0}")]
    InvalidStructure(String),
    #[error("Manifest declares no package: {0}")]
    MissingPackage(String),
    #[error("Invalid package name '{0}'")]
    InvalidPackage(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Manifest parser
pub struct ManifestParser;

impl ManifestParser {
    /// Parse a manifest file from path
    pub fn parse_file(path: impl AsRef<Path>) -> Result<AndroidManifest, ParseError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ParseError::FileNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse_string(&content)
    }

    /// Read the package name declared by the manifest at `path`
    ///
    /// Fails with [`ParseError::MissingPackage`] when the manifest parses but
    /// has no `package` attribute.
    pub fn read_package_name(path: impl AsRef<Path>) -> Result<String, ParseError> {
        let path = path.as_ref();
        let manifest = Self::parse_file(path)?;
        let package = manifest
            .package_name()
            .ok_or_else(|| ParseError::MissingPackage(path.display().to_string()))?;

        if !is_valid_package_name(package) {
            warn!("Manifest {:?} declares unusable package '{}'", path, package);
            return Err(ParseError::InvalidPackage(package.to_string()));
        }

        debug!("Manifest {:?} declares package {}", path, package);
        Ok(package.to_string())
    }

    /// Parse manifest from string
    pub fn parse_string(xml: &str) -> Result<AndroidManifest, ParseError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut manifest = AndroidManifest::default();
        let mut buf = Vec::new();
        let mut seen_root = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    match e.name().as_ref() {
                        b"manifest" if !seen_root => {
                            seen_root = true;
                            Self::parse_manifest_attrs(&mut manifest, e);
                        }
                        other if !seen_root => {
                            return Err(ParseError::InvalidStructure(format!(
                                "expected <manifest> root element, found <{}>",
                                String::from_utf8_lossy(other)
                            )));
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(ParseError::XmlError(e)),
                _ => {}
            }
            buf.clear();
        }

        if !seen_root {
            return Err(ParseError::InvalidStructure("no <manifest> element".into()));
        }

        Ok(manifest)
    }

    /// Get an attribute by its qualified name
    fn get_attr(e: &BytesStart, name: &str) -> Option<String> {
        for attr in e.attributes().filter_map(|a| a.ok()) {
            let key = std::str::from_utf8(attr.key.as_ref()).ok()?;
            if key == name {
                return std::str::from_utf8(&attr.value).ok().map(|s| s.to_string());
            }
        }
        None
    }

    fn parse_manifest_attrs(manifest: &mut AndroidManifest, e: &BytesStart) {
        manifest.package = Self::get_attr(e, "package").unwrap_or_default();
    }
}
