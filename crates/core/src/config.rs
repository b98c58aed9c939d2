//! Application Configuration
//!
//! Manages the settings that drive resource generation:
//! - Build directory layout (generated sources, symbol files, caches)
//! - Incremental build switch
//! - Logging preferences

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use tracing::{info, debug};

use crate::error::{Result, RDroidError};

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuildSettings {
    /// Reuse cached freshness records between runs
    pub incremental: bool,
    /// Generated sources directory, relative to the module build directory
    pub generated_dir: PathBuf,
    /// Application symbol table, relative to the module build directory
    pub full_symbol_file: PathBuf,
    /// Cache storage, relative to the module build directory
    pub cache_dir: PathBuf,
    /// Manifest file name inside a library directory
    pub manifest_file_name: String,
    /// Symbol file name inside a library directory
    pub symbol_file_name: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            incremental: true,
            generated_dir: PathBuf::from("gen"),
            full_symbol_file: PathBuf::from("bin").join("res").join("R.txt"),
            cache_dir: PathBuf::from("intermediate").join("caches"),
            manifest_file_name: "AndroidManifest.xml".to_string(),
            symbol_file_name: "R.txt".to_string(),
        }
    }
}

impl BuildSettings {
    /// Resolve the generated sources directory for a build directory
    pub fn generated_dir_in(&self, build_dir: &Path) -> PathBuf {
        build_dir.join(&self.generated_dir)
    }

    /// Resolve the full symbol table path for a build directory
    pub fn full_symbol_file_in(&self, build_dir: &Path) -> PathBuf {
        build_dir.join(&self.full_symbol_file)
    }

    /// Resolve the cache directory for a build directory
    pub fn cache_dir_in(&self, build_dir: &Path) -> PathBuf {
        build_dir.join(&self.cache_dir)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Include the event target (module path)
    pub show_target: bool,
    /// Include source file and line
    pub show_file_and_line: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            show_target: false,
            show_file_and_line: true,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration version for migrations
    pub version: u32,
    /// Build settings
    pub build: BuildSettings,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            build: BuildSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "rdroid", "R-Droid")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load configuration from the default location
    pub async fn load() -> Result<Self> {
        let config_file = Self::config_file()
            .ok_or_else(|| RDroidError::Config("Cannot determine config path".into()))?;
        Self::load_or_create(&config_file).await
    }

    /// Load configuration from `path`, writing defaults there if it does not exist
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {:?}", path);
            let contents = tokio::fs::read_to_string(path).await?;
            Self::from_toml(&contents)
        } else {
            info!("Config file not found, using defaults");
            let config = AppConfig::default();
            config.save_to(path).await?;
            Ok(config)
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if config.version == 0 {
            return Err(RDroidError::Config("config version must be at least 1".into()));
        }
        Ok(config)
    }

    /// Save configuration to `path`
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }
}
