//! Module-owned cache storage
//!
//! A [`CacheHolder`] keeps every cache of one build module, loads each one
//! from `<dir>/<name>.json` the first time it is requested, and writes the
//! changed ones back on [`CacheHolder::save`].

use std::any::Any;
use std::collections::HashMap;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{Cache, CacheError};

/// Typed name of a cache inside a [`CacheHolder`]
pub struct CacheKey<I, O> {
    name: &'static str,
    _types: PhantomData<fn() -> (I, O)>,
}

impl<I, O> CacheKey<I, O> {
    /// Create a key
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _types: PhantomData,
        }
    }

    /// Storage name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

trait StoredCache {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn is_dirty(&self) -> bool;
    fn to_bytes(&self) -> Result<Vec<u8>, CacheError>;
    fn mark_saved(&mut self);
}

impl<I, O> StoredCache for Cache<I, O>
where
    I: Serialize + DeserializeOwned + 'static,
    O: Serialize + DeserializeOwned + 'static,
{
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn is_dirty(&self) -> bool {
        Cache::is_dirty(self)
    }

    fn to_bytes(&self) -> Result<Vec<u8>, CacheError> {
        Cache::to_bytes(self)
    }

    fn mark_saved(&mut self) {
        Cache::mark_saved(self)
    }
}

/// Every cache of one build module
pub struct CacheHolder {
    dir: PathBuf,
    caches: HashMap<&'static str, Box<dyn StoredCache>>,
}

impl CacheHolder {
    /// Create a holder persisting into `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            caches: HashMap::new(),
        }
    }

    /// Storage directory
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Get the cache for `key`, loading it from disk on first use
    pub fn cache_mut<I, O>(&mut self, key: &CacheKey<I, O>) -> Result<&mut Cache<I, O>, CacheError>
    where
        I: Serialize + DeserializeOwned + 'static,
        O: Serialize + DeserializeOwned + 'static,
    {
        if !self.caches.contains_key(key.name) {
            let cache: Cache<I, O> = self.read(key.name)?;
            self.caches.insert(key.name, Box::new(cache));
        }

        self.caches
            .get_mut(key.name)
            .and_then(|stored| stored.as_any_mut().downcast_mut::<Cache<I, O>>())
            .ok_or_else(|| CacheError::TypeMismatch(key.name.to_string()))
    }

    /// Write every changed cache to disk
    pub fn save(&mut self) -> Result<(), CacheError> {
        for (name, cache) in self.caches.iter_mut() {
            if !cache.is_dirty() {
                continue;
            }

            std::fs::create_dir_all(&self.dir).map_err(|source| CacheError::Storage {
                path: self.dir.clone(),
                source,
            })?;

            let path = storage_path(&self.dir, name);
            let bytes = cache.to_bytes()?;
            write_atomic(&self.dir, &path, &bytes)?;
            cache.mark_saved();
            debug!("Saved cache {} to {:?}", name, path);
        }
        Ok(())
    }

    fn read<I, O>(&self, name: &str) -> Result<Cache<I, O>, CacheError>
    where
        I: Serialize + DeserializeOwned,
        O: Serialize + DeserializeOwned,
    {
        let path = storage_path(&self.dir, name);
        if !path.exists() {
            return Ok(Cache::new());
        }

        let bytes = std::fs::read(&path).map_err(|source| CacheError::Storage {
            path: path.clone(),
            source,
        })?;

        // A cache that cannot be trusted only costs a full rebuild.
        match Cache::from_bytes(&bytes) {
            Ok(Some(cache)) => Ok(cache),
            Ok(None) => {
                warn!("Discarding cache {:?} written by an incompatible version", path);
                Ok(Cache::new())
            }
            Err(e) => {
                warn!("Discarding unreadable cache {:?}: {}", path, e);
                Ok(Cache::new())
            }
        }
    }
}

fn storage_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}.json", name))
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let storage = |source| CacheError::Storage {
        path: path.to_path_buf(),
        source,
    };

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(storage)?;
    file.write_all(bytes).map_err(storage)?;
    file.persist(path).map_err(|e| storage(e.error))?;
    Ok(())
}
