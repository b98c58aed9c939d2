//! Symbol writer
//!
//! Merges library symbol tables that share a package and writes that
//! package's `R.java`, with every value taken from the application's full
//! symbol table.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use super::symbol::{Symbol, SymbolTable};
use crate::BuildError;

const HEADER: &str = "\
/* AUTO-GENERATED FILE.  DO NOT MODIFY.
 *
 * This class was automatically generated by the
 * aapt tool from the resource data it found.  It
 * should not be modified by hand.
 */
";

/// What [`SymbolWriter::write`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// New content written
    Written(PathBuf),
    /// Existing file already had this content
    Unchanged(PathBuf),
    /// Nothing left to declare; the previous file was deleted
    Removed(PathBuf),
    /// Nothing left to declare and no previous file
    Empty,
    /// No full symbol table to validate against
    Skipped,
}

/// Writes the `R.java` of one package
pub struct SymbolWriter {
    out_dir: PathBuf,
    package: String,
    full: Option<Arc<SymbolTable>>,
    tables: Vec<Arc<SymbolTable>>,
}

impl SymbolWriter {
    pub fn new(
        out_dir: impl Into<PathBuf>,
        package: impl Into<String>,
        full: Option<Arc<SymbolTable>>,
    ) -> Self {
        Self {
            out_dir: out_dir.into(),
            package: package.into(),
            full,
            tables: Vec::new(),
        }
    }

    /// Add a library table declaring symbols for this package
    pub fn add_symbols_to_write(&mut self, table: Arc<SymbolTable>) {
        self.tables.push(table);
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    /// `<out_dir>/<package dirs>/R.java`
    pub fn output_path(&self) -> PathBuf {
        output_path(&self.out_dir, &self.package)
    }

    /// Union of the library symbols that exist in the full table, carrying
    /// the full table's values, grouped by resource type
    ///
    /// `None` without a full table.
    pub fn merged(&self) -> Option<BTreeMap<&str, BTreeMap<&str, &Symbol>>> {
        let full = self.full.as_deref()?;
        let mut merged: BTreeMap<&str, BTreeMap<&str, &Symbol>> = BTreeMap::new();

        for table in &self.tables {
            for symbol in table.iter() {
                let Some(resolved) = full.get(&symbol.resource_type, &symbol.name) else {
                    continue;
                };
                merged
                    .entry(resolved.resource_type.as_str())
                    .or_default()
                    .entry(resolved.name.as_str())
                    .or_insert(resolved);
            }
        }
        Some(merged)
    }

    /// Source text, or `None` when there is nothing to declare
    pub fn render(&self) -> Option<String> {
        let merged = self.merged()?;
        if merged.is_empty() {
            return None;
        }

        let mut out = String::with_capacity(HEADER.len() + 64 * merged.len());
        out.push_str(HEADER);
        let _ = writeln!(out, "package {};\n", self.package);
        out.push_str("public final class R {\n");
        for (resource_type, symbols) in &merged {
            let _ = writeln!(out, "    public static final class {} {{", resource_type);
            for symbol in symbols.values() {
                let _ = writeln!(out, "        {}", symbol.java_field());
            }
            out.push_str("    }\n");
        }
        out.push_str("}\n");
        Some(out)
    }

    /// Write the package source
    ///
    /// The target is replaced atomically; a failed write leaves the previous
    /// file in place.
    pub fn write(&self) -> Result<WriteOutcome, BuildError> {
        if self.full.is_none() {
            return Ok(WriteOutcome::Skipped);
        }

        let path = self.output_path();
        let Some(content) = self.render() else {
            return match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed {:?}: no symbols left for {}", path, self.package);
                    Ok(WriteOutcome::Removed(path))
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(WriteOutcome::Empty),
                Err(e) => Err(BuildError::output(&path, e)),
            };
        };

        if std::fs::read(&path).map(|old| old == content.as_bytes()).unwrap_or(false) {
            debug!("{:?} is up to date", path);
            return Ok(WriteOutcome::Unchanged(path));
        }

        write_atomic(&path, content.as_bytes()).map_err(|e| BuildError::output(&path, e))?;
        debug!("Wrote {:?}", path);
        Ok(WriteOutcome::Written(path))
    }
}

/// Generated source path for `package` under `out_dir`
pub fn output_path(out_dir: &Path, package: &str) -> PathBuf {
    let mut path = out_dir.to_path_buf();
    path.extend(package.split('.'));
    path.join("R.java")
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(path: &str, lines: &[&str]) -> Arc<SymbolTable> {
        let mut table = SymbolTable::new(path);
        for line in lines {
            table.insert(Symbol::parse_line(line).unwrap());
        }
        Arc::new(table)
    }

    fn full() -> Arc<SymbolTable> {
        table(
            "bin/res/R.txt",
            &[
                "int id icon 0x7f010001",
                "int id logo 0x7f010002",
                "int string app_name 0x7f020001",
                "int attr color 0x7f030001",
                "int[] styleable MyView { 0x7f030001 }",
                "int styleable MyView_color 0",
            ],
        )
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("gen"), "com.example.lib"),
            Path::new("gen/com/example/lib/R.java")
        );
    }

    #[test]
    fn test_render_rewrites_and_sorts() {
        let mut writer = SymbolWriter::new("gen", "com.a", Some(full()));
        writer.add_symbols_to_write(table(
            "a/R.txt",
            &[
                "int string app_name 0x1",
                "int id logo 0x3",
                "int id icon 0x2",
                "int id gone 0x4",
                "int[] styleable MyView { 0x5 }",
            ],
        ));

        let text = writer.render().unwrap();
        let expected = format!(
            "{}package com.a;\n\npublic final class R {{\n\
             \x20   public static final class id {{\n\
             \x20       public static final int icon=0x7f010001;\n\
             \x20       public static final int logo=0x7f010002;\n\
             \x20   }}\n\
             \x20   public static final class string {{\n\
             \x20       public static final int app_name=0x7f020001;\n\
             \x20   }}\n\
             \x20   public static final class styleable {{\n\
             \x20       public static final int[] MyView={{ 0x7f030001 }};\n\
             \x20   }}\n\
             }}\n",
            HEADER
        );
        assert_eq!(text, expected);
        assert!(!text.contains("gone"));
    }

    #[test]
    fn test_union_of_shared_package() {
        let mut writer = SymbolWriter::new("gen", "com.shared", Some(full()));
        writer.add_symbols_to_write(table("one/R.txt", &["int id icon 0x1"]));
        writer.add_symbols_to_write(table("two/R.txt", &["int id logo 0x1", "int id icon 0x9"]));

        let merged = writer.merged().unwrap();
        let ids: Vec<&str> = merged["id"].keys().copied().collect();
        assert_eq!(ids, vec!["icon", "logo"]);
        assert_eq!(writer.render().unwrap().matches("icon=").count(), 1);
    }

    #[test]
    fn test_write_is_skipped_without_full_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SymbolWriter::new(dir.path(), "com.a", None);
        writer.add_symbols_to_write(table("a/R.txt", &["int id icon 0x1"]));

        assert_eq!(writer.write().unwrap(), WriteOutcome::Skipped);
        assert!(!writer.output_path().exists());
    }

    #[test]
    fn test_write_then_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SymbolWriter::new(dir.path(), "com.a", Some(full()));
        writer.add_symbols_to_write(table("a/R.txt", &["int id icon 0x1"]));

        let path = writer.output_path();
        assert_eq!(writer.write().unwrap(), WriteOutcome::Written(path.clone()));
        assert!(std::fs::read_to_string(&path).unwrap().contains("icon=0x7f010001;"));
        assert_eq!(writer.write().unwrap(), WriteOutcome::Unchanged(path));
    }

    #[test]
    fn test_empty_package_removes_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = SymbolWriter::new(dir.path(), "com.a", Some(full()));
        writer.add_symbols_to_write(table("a/R.txt", &["int id stale 0x1"]));

        assert_eq!(writer.write().unwrap(), WriteOutcome::Empty);

        let path = writer.output_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "old").unwrap();
        assert_eq!(writer.write().unwrap(), WriteOutcome::Removed(path.clone()));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_failure_is_compilation_failure() {
        let dir = tempfile::tempdir().unwrap();
        // a file where the package directory should be
        std::fs::write(dir.path().join("com"), "").unwrap();

        let mut writer = SymbolWriter::new(dir.path(), "com.a", Some(full()));
        writer.add_symbols_to_write(table("a/R.txt", &["int id icon 0x1"]));

        let err = writer.write().unwrap_err();
        assert!(matches!(err, BuildError::CompilationFailed(_)));
    }
}
