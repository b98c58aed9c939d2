//! Library symbol merge task
//!
//! Regenerates the `R.java` of every library package of a module, with
//! values taken from the module's own compiled symbol table. Libraries whose
//! symbol file did not change since the last run are skipped, unless
//! something else about their package (another library of the same package,
//! the full symbol table) changed.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use r_droid_core::{BuildSettings, LogLevel};
use r_droid_manifest_manager::ManifestParser;
use tracing::debug;

use super::loader::SymbolLoader;
use super::symbol::SymbolTable;
use super::writer::{self, SymbolWriter, WriteOutcome};
use crate::cache::{CacheKey, FileSignature};
use crate::config::BuildType;
use crate::diagnostics::{BuildLogger, Diagnostic};
use crate::module::BuildModule;
use crate::task::Task;
use crate::BuildError;

/// Library symbol files, keyed by path; input is the package, output the generated file
pub const MERGE_SYMBOLS_CACHE: CacheKey<String, PathBuf> = CacheKey::new("mergeSymbolsCache");

/// The module's own symbol table
pub const FULL_TABLE_CACHE: CacheKey<(), ()> = CacheKey::new("mergeSymbolsFullTable");

const TASK_NAME: &str = "SymbolProcessor";

/// What one run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Packages whose generated file was (re)written
    pub written: Vec<String>,
    /// Packages regenerated with identical content
    pub unchanged: Vec<String>,
    /// Library symbol files skipped because nothing about them changed
    pub fresh: Vec<PathBuf>,
    /// Library directories left out of this run
    pub excluded: Vec<PathBuf>,
    /// Generated files deleted
    pub deleted: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
struct Candidate {
    dir: PathBuf,
    symbol_file: PathBuf,
    package: String,
}

/// Libraries found this run
#[derive(Debug, Default)]
struct Discovery {
    candidates: Vec<Candidate>,
    /// Symbol files of libraries whose manifest could not be read
    unreadable: HashSet<PathBuf>,
}

#[derive(Debug, Clone)]
struct ResolvedPaths {
    generated_dir: PathBuf,
    full_symbol_file: PathBuf,
}

/// Merges library symbol tables into per-package `R.java` files
pub struct MergeSymbolsTask<'a, M: BuildModule> {
    module: &'a mut M,
    settings: BuildSettings,
    logger: &'a dyn BuildLogger,
    paths: Option<ResolvedPaths>,
    report: MergeReport,
}

impl<'a, M: BuildModule> MergeSymbolsTask<'a, M> {
    pub fn new(module: &'a mut M, settings: BuildSettings, logger: &'a dyn BuildLogger) -> Self {
        Self {
            module,
            settings,
            logger,
            paths: None,
            report: MergeReport::default(),
        }
    }

    /// Summary of the last run
    pub fn report(&self) -> &MergeReport {
        &self.report
    }

    /// Generated sources directory, once prepared
    pub fn generated_dir(&self) -> Option<&Path> {
        self.paths.as_ref().map(|p| p.generated_dir.as_path())
    }

    /// Full symbol table path, once prepared
    pub fn full_symbol_file(&self) -> Option<&Path> {
        self.paths.as_ref().map(|p| p.full_symbol_file.as_path())
    }

    fn discover(&mut self) -> Discovery {
        let own_package = self.module.package_name();
        let mut found = Discovery::default();

        for dir in self.module.libraries() {
            if !dir.is_dir() {
                self.logger
                    .log(Diagnostic::new(LogLevel::Error, "library directory not found").at(dir));
                self.report.excluded.push(dir.clone());
                continue;
            }

            let manifest = dir.join(&self.settings.manifest_file_name);
            let package = match ManifestParser::read_package_name(&manifest) {
                Ok(package) => package,
                Err(e) => {
                    self.logger.log(
                        Diagnostic::new(LogLevel::Warn, format!("skipping library: {}", e)).at(dir),
                    );
                    self.report.excluded.push(dir.clone());
                    let symbol_file = dir.join(&self.settings.symbol_file_name);
                    if symbol_file.is_file() {
                        found.unreadable.insert(symbol_file);
                    }
                    continue;
                }
            };

            if package == own_package {
                self.logger.debug(&format!(
                    "Skipping {:?}: it shares the application package {}",
                    dir, package
                ));
                continue;
            }

            let symbol_file = dir.join(&self.settings.symbol_file_name);
            if !symbol_file.is_file() {
                self.logger.debug(&format!("Skipping {:?}: no symbol file", dir));
                continue;
            }

            found.candidates.push(Candidate {
                dir: dir.clone(),
                symbol_file,
                package,
            });
        }

        found.candidates.sort_by(|a, b| a.symbol_file.cmp(&b.symbol_file));
        found.candidates.dedup_by(|a, b| a.symbol_file == b.symbol_file);
        found
    }
}

impl<'a, M: BuildModule> Task for MergeSymbolsTask<'a, M> {
    fn name(&self) -> &str {
        TASK_NAME
    }

    fn prepare(&mut self, build_type: BuildType) {
        let build_dir = self.module.build_directory();
        let paths = ResolvedPaths {
            generated_dir: self.settings.generated_dir_in(build_dir),
            full_symbol_file: self.settings.full_symbol_file_in(build_dir),
        };
        debug!(
            "Prepared {} ({} build): sources in {:?}, symbols from {:?}",
            TASK_NAME, build_type, paths.generated_dir, paths.full_symbol_file
        );
        self.paths = Some(paths);
    }

    fn run(&mut self) -> Result<(), BuildError> {
        let paths = self
            .paths
            .clone()
            .ok_or_else(|| BuildError::InvalidState(format!("{} was not prepared", TASK_NAME)))?;
        self.report = MergeReport::default();

        let Discovery { candidates, unreadable } = self.discover();
        let logger = self.logger;
        let incremental = self.settings.incremental;
        let holder = self.module.cache_holder_mut();
        let report = &mut self.report;

        let full_changed = holder.cache_mut(&FULL_TABLE_CACHE)?.needs(&paths.full_symbol_file);

        // Reconcile with the previous run and work out which packages to regenerate.
        let cache = holder.cache_mut(&MERGE_SYMBOLS_CACHE)?;
        let live_packages: HashSet<&str> = candidates.iter().map(|c| c.package.as_str()).collect();
        let mut stale: BTreeSet<String> = BTreeSet::new();
        let mut orphaned: BTreeSet<PathBuf> = BTreeSet::new();

        let live_files: HashSet<&Path> = candidates.iter().map(|c| c.symbol_file.as_path()).collect();
        for key in cache.keys() {
            if live_files.contains(key.as_path()) {
                continue;
            }
            if unreadable.contains(&key) && !cache.needs(&key) {
                debug!("Keeping the output of {:?}: its manifest is unreadable", key);
                continue;
            }
            if let Some(entry) = cache.remove(&key) {
                debug!("{:?} is no longer a library symbol file", key);
                forget_package(&entry.input, entry.output, &live_packages, &mut stale, &mut orphaned);
            }
        }

        for candidate in &candidates {
            let previous = cache.get(&candidate.symbol_file).map(|e| (e.input.clone(), e.output.clone()));
            match previous {
                Some((package, output)) if package != candidate.package => {
                    forget_package(&package, output, &live_packages, &mut stale, &mut orphaned);
                    stale.insert(candidate.package.clone());
                }
                Some(_) if incremental && !full_changed && !cache.needs(&candidate.symbol_file) => {}
                _ => {
                    stale.insert(candidate.package.clone());
                }
            }
        }

        // A kept library is left out of a regenerated package; it must rejoin it later.
        for key in &unreadable {
            if cache.get(key).is_some_and(|entry| stale.contains(&entry.input)) {
                cache.remove(key);
            }
        }

        for output in orphaned {
            if remove_output(&output)? {
                logger.info(&format!("Deleted stale {}", output.display()));
                report.deleted.push(output);
            }
        }

        // Load what has to be regenerated; the full table only if anything does.
        let mut full: Option<(Arc<SymbolTable>, FileSignature)> = None;
        let mut groups: BTreeMap<&str, Vec<(&Candidate, Arc<SymbolTable>, FileSignature)>> =
            BTreeMap::new();
        if !stale.is_empty() {
            full = match SymbolLoader::new(&paths.full_symbol_file).load_with_signature(logger) {
                Ok(loaded) => Some(loaded),
                Err(e) => {
                    logger.log(Diagnostic::new(
                        LogLevel::Error,
                        format!("cannot merge library symbols: {}", e),
                    ));
                    None
                }
            };

            let to_load = candidates.iter().filter(|c| full.is_some() && stale.contains(&c.package));
            for candidate in to_load {
                match SymbolLoader::new(&candidate.symbol_file).load_with_signature(logger) {
                    Ok((table, signature)) => groups
                        .entry(candidate.package.as_str())
                        .or_default()
                        .push((candidate, table, signature)),
                    Err(e) => {
                        logger.log(
                            Diagnostic::new(LogLevel::Warn, format!("skipping library: {}", e))
                                .at(&candidate.dir),
                        );
                        report.excluded.push(candidate.dir.clone());
                    }
                }
            }
        }

        let mut processed: HashMap<&Path, FileSignature> = HashMap::new();
        if let Some((full_table, _)) = &full {
            for package in &stale {
                let Some(tables) = groups.get(package.as_str()) else {
                    // every library of the package failed to load
                    let output = writer::output_path(&paths.generated_dir, package);
                    if remove_output(&output)? {
                        report.deleted.push(output);
                    }
                    continue;
                };

                let mut symbol_writer = SymbolWriter::new(
                    &paths.generated_dir,
                    package.as_str(),
                    Some(Arc::clone(full_table)),
                );
                for (_, table, _) in tables {
                    symbol_writer.add_symbols_to_write(Arc::clone(table));
                }
                match symbol_writer.write()? {
                    WriteOutcome::Written(_) => report.written.push(package.clone()),
                    WriteOutcome::Unchanged(_) => report.unchanged.push(package.clone()),
                    WriteOutcome::Removed(path) => {
                        logger.info(&format!("No symbols left for {}", package));
                        report.deleted.push(path);
                    }
                    WriteOutcome::Empty | WriteOutcome::Skipped => {}
                }
                for (candidate, _, signature) in tables {
                    processed.insert(candidate.symbol_file.as_path(), signature.clone());
                }
            }
        }

        // Record what is now up to date. Libraries of a package that was due
        // but not regenerated lose their entry, so the package is retried.
        let cache = holder.cache_mut(&MERGE_SYMBOLS_CACHE)?;
        for candidate in &candidates {
            if !stale.contains(&candidate.package) {
                report.fresh.push(candidate.symbol_file.clone());
                cache.touch(&candidate.symbol_file);
            } else if let Some(signature) = processed.remove(candidate.symbol_file.as_path()) {
                let output = writer::output_path(&paths.generated_dir, &candidate.package);
                cache.load_with_signature(
                    &candidate.symbol_file,
                    signature,
                    candidate.package.clone(),
                    output,
                );
            } else if cache.remove(&candidate.symbol_file).is_some() {
                debug!("{:?} will be processed again", candidate.symbol_file);
            }
        }

        if let Some((_, signature)) = full {
            holder
                .cache_mut(&FULL_TABLE_CACHE)?
                .load_with_signature(&paths.full_symbol_file, signature, (), ());
        }
        holder.save()?;

        logger.info(&format!(
            "Merged library symbols: {} written, {} unchanged, {} fresh, {} excluded, {} deleted",
            report.written.len(),
            report.unchanged.len(),
            report.fresh.len(),
            report.excluded.len(),
            report.deleted.len()
        ));
        Ok(())
    }
}

/// A package lost a library: regenerate it if others remain, otherwise drop its output
fn forget_package(
    package: &str,
    output: PathBuf,
    live_packages: &HashSet<&str>,
    stale: &mut BTreeSet<String>,
    orphaned: &mut BTreeSet<PathBuf>,
) {
    if live_packages.contains(package) {
        stale.insert(package.to_string());
    } else {
        orphaned.insert(output);
    }
}

fn remove_output(path: &Path) -> Result<bool, BuildError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BuildError::output(path, e)),
    }
}
