//! R-Droid Core - configuration and shared types
//!
//! This crate provides the pieces every R-Droid build component shares:
//! configuration, the error type, the build event bus and logging setup.

pub mod config;
pub mod events;
pub mod error;
pub mod logging;

pub use config::{AppConfig, BuildSettings, LoggingConfig};
pub use events::{Event, EventBus, EventSubscription, LogLevel};
pub use error::{RDroidError, Result};

/// R-Droid version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
