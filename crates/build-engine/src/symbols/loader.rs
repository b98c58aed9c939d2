//! Symbol file loader
//!
//! Parses `R.txt` files produced by the resource compiler.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use chrono::{DateTime, Utc};
use r_droid_core::LogLevel;

use super::symbol::{Symbol, SymbolLineError, SymbolTable};
use crate::cache::FileSignature;
use crate::diagnostics::{BuildLogger, Diagnostic};

/// File-level symbol file failures
///
/// These make the whole file unusable; single bad lines are only reported.
#[derive(Debug, thiserror::Error)]
pub enum SymbolParseError {
    #[error("Cannot read symbol file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not a symbol file (line {line}: {reason})")]
    Header {
        path: PathBuf,
        line: usize,
        #[source]
        reason: SymbolLineError,
    },
}

/// Loads one symbol file, at most once
pub struct SymbolLoader {
    path: PathBuf,
    loaded: Option<(Arc<SymbolTable>, FileSignature)>,
}

impl SymbolLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: None,
        }
    }

    /// File this loader reads
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The loaded table, if [`load`](Self::load) succeeded
    pub fn table(&self) -> Option<&Arc<SymbolTable>> {
        self.loaded.as_ref().map(|(table, _)| table)
    }

    /// Signature of the exact bytes the loaded table was parsed from
    pub fn signature(&self) -> Option<&FileSignature> {
        self.loaded.as_ref().map(|(_, signature)| signature)
    }

    /// Parse the file
    ///
    /// The first successful call parses; later calls return the same table.
    pub fn load(&mut self, logger: &dyn BuildLogger) -> Result<Arc<SymbolTable>, SymbolParseError> {
        self.load_with_signature(logger).map(|(table, _)| table)
    }

    /// Parse the file, also returning the signature of the bytes parsed
    pub fn load_with_signature(
        &mut self,
        logger: &dyn BuildLogger,
    ) -> Result<(Arc<SymbolTable>, FileSignature), SymbolParseError> {
        if let Some((table, signature)) = &self.loaded {
            return Ok((Arc::clone(table), signature.clone()));
        }

        let modified = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        let bytes = std::fs::read(&self.path).map_err(|source| SymbolParseError::Io {
            path: self.path.clone(),
            source,
        })?;
        let signature = FileSignature::of_bytes(&bytes, modified);
        let content = String::from_utf8(bytes).map_err(|e| SymbolParseError::Io {
            path: self.path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;

        let table = Arc::new(parse_symbols(&self.path, &content, logger)?);
        logger.debug(&format!("Loaded {} symbols from {}", table.len(), self.path.display()));
        self.loaded = Some((Arc::clone(&table), signature.clone()));
        Ok((table, signature))
    }
}

/// Parse symbol file `content` read from `path`
///
/// The first non-blank, non-comment line must be a valid symbol line.
/// Later malformed lines and duplicate keys are reported and skipped.
pub fn parse_symbols(
    path: &Path,
    content: &str,
    logger: &dyn BuildLogger,
) -> Result<SymbolTable, SymbolParseError> {
    let mut table = SymbolTable::new(path);
    let mut seen_header = false;

    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let symbol = match Symbol::parse_line(trimmed) {
            Ok(symbol) => symbol,
            Err(reason) if !seen_header => {
                return Err(SymbolParseError::Header {
                    path: path.to_path_buf(),
                    line: line_number,
                    reason,
                });
            }
            Err(reason) => {
                logger.log(
                    Diagnostic::new(LogLevel::Warn, format!("skipping malformed symbol: {}", reason))
                        .at(path)
                        .line(line_number),
                );
                continue;
            }
        };
        seen_header = true;

        let (resource_type, name) = (symbol.resource_type.clone(), symbol.name.clone());
        if !table.insert(symbol) {
            logger.log(
                Diagnostic::new(
                    LogLevel::Warn,
                    format!("duplicate symbol {}/{}, keeping the first definition", resource_type, name),
                )
                .at(path)
                .line(line_number),
            );
        }
    }

    Ok(table)
}
