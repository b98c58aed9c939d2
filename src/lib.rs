//! R-Droid resgen
//!
//! Incremental R.java generation for Android library dependencies.
//!
//! ## Architecture
//!
//! - `r-droid-core`: configuration, logging setup, and build events
//! - `r-droid-manifest-manager`: AndroidManifest.xml package lookup
//! - `r-droid-build-engine`: task lifecycle, incremental cache, symbol merging

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commands;

// Re-export main components for library usage
pub use r_droid_core as core;
pub use r_droid_manifest_manager as manifest;
pub use r_droid_build_engine as build;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "R-Droid resgen";
