//! Build modules
//!
//! What a task sees of the module it builds.

use std::path::{Path, PathBuf};
use r_droid_core::BuildSettings;

use crate::cache::CacheHolder;

/// A buildable Android module
pub trait BuildModule {
    /// Package declared by the module's own manifest
    fn package_name(&self) -> &str;

    /// Root of the module's build outputs
    fn build_directory(&self) -> &Path;

    /// Declared library directories, each holding a manifest and a symbol file
    fn libraries(&self) -> &[PathBuf];

    /// Caches owned by this module
    fn cache_holder_mut(&mut self) -> &mut CacheHolder;
}

/// An application module with its library dependencies
pub struct AndroidModule {
    package: String,
    build_dir: PathBuf,
    libraries: Vec<PathBuf>,
    caches: CacheHolder,
}

impl AndroidModule {
    /// Create a module whose caches live in `cache_dir`
    pub fn new(
        package: impl Into<String>,
        build_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            package: package.into(),
            build_dir: build_dir.into(),
            libraries: Vec::new(),
            caches: CacheHolder::new(cache_dir),
        }
    }

    /// Create a module laid out by `settings`
    pub fn with_settings(
        package: impl Into<String>,
        build_dir: impl Into<PathBuf>,
        settings: &BuildSettings,
    ) -> Self {
        let build_dir = build_dir.into();
        let cache_dir = settings.cache_dir_in(&build_dir);
        Self::new(package, build_dir, cache_dir)
    }

    /// Declare a library directory
    pub fn add_library(&mut self, dir: impl Into<PathBuf>) {
        self.libraries.push(dir.into());
    }

    /// Declare several library directories
    pub fn with_libraries<P: Into<PathBuf>>(mut self, dirs: impl IntoIterator<Item = P>) -> Self {
        self.libraries.extend(dirs.into_iter().map(Into::into));
        self
    }
}

impl BuildModule for AndroidModule {
    fn package_name(&self) -> &str {
        &self.package
    }

    fn build_directory(&self) -> &Path {
        &self.build_dir
    }

    fn libraries(&self) -> &[PathBuf] {
        &self.libraries
    }

    fn cache_holder_mut(&mut self) -> &mut CacheHolder {
        &mut self.caches
    }
}
