//! Incremental build cache
//!
//! Tracks input files by content signature so tasks can skip inputs that
//! did not change since they were last processed. Each entry carries an
//! input association (what the file was processed as) and an output
//! association (what was produced from it).
//!
//! Caches are module-scoped, owned by a [`CacheHolder`], and have no
//! internal locking: one task run at a time per module.

mod holder;
mod signature;

pub use holder::{CacheHolder, CacheKey};
pub use signature::FileSignature;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Cache format version - increment when the entry layout changes
pub const CACHE_VERSION: u32 = 1;

/// Cache errors
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cannot read tracked file {path}: {source}")]
    Signature {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cache storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Cache '{0}' was requested with different entry types")]
    TypeMismatch(String),
}

/// Freshness record for one tracked file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<I, O> {
    /// Tracked file
    pub path: PathBuf,
    /// Content signature captured when the work completed
    pub signature: FileSignature,
    /// Input association
    pub input: I,
    /// Output association
    pub output: O,
    /// When the entry was last recorded
    pub last_seen: DateTime<Utc>,
}

/// Persisted form of a cache
#[derive(Deserialize)]
struct CacheFile<I, O> {
    version: u32,
    entries: Vec<CacheEntry<I, O>>,
}

#[derive(Serialize)]
struct CacheFileRef<'a, I, O> {
    version: u32,
    entries: Vec<&'a CacheEntry<I, O>>,
}

/// Mapping from tracked file to freshness record
#[derive(Debug, Clone, PartialEq)]
pub struct Cache<I, O> {
    entries: BTreeMap<PathBuf, CacheEntry<I, O>>,
    dirty: bool,
}

impl<I, O> Default for Cache<I, O> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            dirty: false,
        }
    }
}

impl<I, O> Cache<I, O> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` must be (re)processed
    ///
    /// True when nothing is recorded for `path`, or when its current content
    /// differs from the recorded signature (including when it is unreadable).
    pub fn needs(&self, path: &Path) -> bool {
        match self.entries.get(path) {
            Some(entry) => !entry.signature.matches(path),
            None => true,
        }
    }

    /// Record that `path` was processed successfully
    pub fn load(&mut self, path: &Path, input: I, output: O) -> Result<(), CacheError> {
        let signature = FileSignature::compute(path).map_err(|source| CacheError::Signature {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_with_signature(path, signature, input, output);
        Ok(())
    }

    /// Record that the content identified by `signature` was processed
    ///
    /// Use the signature of the bytes that were actually read, so a file
    /// edited after reading stays stale.
    pub fn load_with_signature(
        &mut self,
        path: &Path,
        signature: FileSignature,
        input: I,
        output: O,
    ) {
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                path: path.to_path_buf(),
                signature,
                input,
                output,
                last_seen: Utc::now(),
            },
        );
        self.dirty = true;
    }

    /// Confirm a fresh entry without re-reading the file
    ///
    /// The recorded signature is kept. Returns false when nothing is tracked.
    pub fn touch(&mut self, path: &Path) -> bool {
        match self.entries.get_mut(path) {
            Some(entry) => {
                entry.last_seen = Utc::now();
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// Evict the entry for `path`, returning it
    pub fn remove(&mut self, path: &Path) -> Option<CacheEntry<I, O>> {
        let removed = self.entries.remove(path);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Every tracked path, sorted
    pub fn keys(&self) -> Vec<PathBuf> {
        self.entries.keys().cloned().collect()
    }

    /// Entry recorded for `path`
    pub fn get(&self, path: &Path) -> Option<&CacheEntry<I, O>> {
        self.entries.get(path)
    }

    /// Number of tracked files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the cache changed since it was loaded or saved
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl<I, O> Cache<I, O>
where
    I: Serialize + DeserializeOwned,
    O: Serialize + DeserializeOwned,
{
    /// Serialize to the on-disk JSON form
    pub fn to_bytes(&self) -> Result<Vec<u8>, CacheError> {
        let file = CacheFileRef {
            version: CACHE_VERSION,
            entries: self.entries.values().collect(),
        };
        Ok(serde_json::to_vec_pretty(&file)?)
    }

    /// Deserialize from the on-disk JSON form
    ///
    /// Returns `Ok(None)` for a cache written by an incompatible version.
    pub fn from_bytes(bytes: &[u8]) -> Result<Option<Self>, CacheError> {
        let file: CacheFile<I, O> = serde_json::from_slice(bytes)?;
        if file.version != CACHE_VERSION {
            return Ok(None);
        }

        let entries = file
            .entries
            .into_iter()
            .map(|entry| (entry.path.clone(), entry))
            .collect();
        Ok(Some(Self { entries, dirty: false }))
    }

    fn mark_saved(&mut self) {
        self.dirty = false;
    }
}
