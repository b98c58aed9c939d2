//! Android Build Engine
//!
//! Incremental build tasks for Android modules. The centrepiece is
//! [`MergeSymbolsTask`], which reconciles library `R.txt` symbol tables
//! against the application's compiled symbol table and regenerates one
//! `R.java` per library package, skipping libraries whose inputs did not
//! change since the last run.

pub mod config;
pub mod task;
pub mod runner;
pub mod module;
pub mod cache;
pub mod diagnostics;
pub mod symbols;

pub use config::BuildType;
pub use task::{Task, TaskState, TrackedTask};
pub use runner::{TaskRunner, TaskRecord};
pub use module::{AndroidModule, BuildModule};
pub use cache::{Cache, CacheEntry, CacheError, CacheHolder, CacheKey, FileSignature};
pub use diagnostics::{BuildLogger, CollectingLogger, Diagnostic, EventLogger, TracingLogger};
pub use symbols::{
    MergeReport, MergeSymbolsTask, Symbol, SymbolKind, SymbolLoader, SymbolParseError,
    SymbolTable, SymbolWriter, WriteOutcome,
};

/// Build errors
///
/// Every variant is fatal for the task that returns it. Recoverable problems
/// are reported through a [`BuildLogger`] instead.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Compilation failed: {0}")]
    CompilationFailed(String),
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("Invalid task state: {0}")]
    InvalidState(String),
    #[error("Task '{task}' failed: {source}")]
    TaskFailed {
        task: String,
        #[source]
        source: Box<BuildError>,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Wrap an I/O failure on a generated output as a compilation failure
    pub fn output(path: &std::path::Path, err: std::io::Error) -> Self {
        BuildError::CompilationFailed(format!("{}: {}", path.display(), err))
    }
}
