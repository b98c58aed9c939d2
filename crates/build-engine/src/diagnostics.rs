//! Build diagnostics
//!
//! Tasks report recoverable problems (a malformed symbol line, a library
//! without a manifest) through a [`BuildLogger`] and keep going. Fatal
//! problems are returned as [`crate::BuildError`] instead.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use parking_lot::Mutex;
use r_droid_core::{Event, EventBus, LogLevel};
use tracing::{debug, error, info, warn};

/// A non-fatal message produced by a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: LogLevel,
    pub message: String,
    /// File the message is about
    pub path: Option<PathBuf>,
    /// 1-based line in `path`
    pub line: Option<usize>,
}

impl Diagnostic {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            path: None,
            line: None,
        }
    }

    /// Attach the file the message is about
    pub fn at(mut self, path: &Path) -> Self {
        self.path = Some(path.to_path_buf());
        self
    }

    /// Attach a line number
    pub fn line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.line) {
            (Some(path), Some(line)) => write!(f, "{}:{}: {}", path.display(), line, self.message),
            (Some(path), None) => write!(f, "{}: {}", path.display(), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Receiver of task diagnostics
pub trait BuildLogger {
    fn log(&self, diagnostic: Diagnostic);

    fn debug(&self, message: &str) {
        self.log(Diagnostic::new(LogLevel::Debug, message));
    }

    fn info(&self, message: &str) {
        self.log(Diagnostic::new(LogLevel::Info, message));
    }

    fn warning(&self, message: &str) {
        self.log(Diagnostic::new(LogLevel::Warn, message));
    }

    fn error(&self, message: &str) {
        self.log(Diagnostic::new(LogLevel::Error, message));
    }
}

fn trace(diagnostic: &Diagnostic) {
    match diagnostic.level {
        LogLevel::Debug => debug!("{}", diagnostic),
        LogLevel::Info => info!("{}", diagnostic),
        LogLevel::Warn => warn!("{}", diagnostic),
        LogLevel::Error => error!("{}", diagnostic),
    }
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl BuildLogger for TracingLogger {
    fn log(&self, diagnostic: Diagnostic) {
        trace(&diagnostic);
    }
}

/// Publishes diagnostics on an [`EventBus`] (and to `tracing`)
#[derive(Clone)]
pub struct EventLogger {
    bus: Arc<EventBus>,
}

impl EventLogger {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }
}

impl BuildLogger for EventLogger {
    fn log(&self, diagnostic: Diagnostic) {
        trace(&diagnostic);
        self.bus.emit(Event::Diagnostic {
            level: diagnostic.level,
            message: diagnostic.to_string(),
        });
    }
}

/// Keeps every diagnostic in memory (and traces it)
#[derive(Debug, Default)]
pub struct CollectingLogger {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything logged so far
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Diagnostics at `level` or above
    pub fn at_least(&self, level: LogLevel) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.level >= level)
            .cloned()
            .collect()
    }
}

impl BuildLogger for CollectingLogger {
    fn log(&self, diagnostic: Diagnostic) {
        trace(&diagnostic);
        self.diagnostics.lock().push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::new(LogLevel::Warn, "bad line").at(Path::new("lib/R.txt")).line(4);
        assert_eq!(d.to_string(), "lib/R.txt:4: bad line");

        let d = Diagnostic::new(LogLevel::Info, "plain");
        assert_eq!(d.to_string(), "plain");
    }

    #[test]
    fn test_collecting_logger_filters_by_level() {
        let logger = CollectingLogger::new();
        logger.debug("found library");
        logger.warning("skipped library");
        logger.error("no symbols");

        assert_eq!(logger.diagnostics().len(), 3);
        let serious = logger.at_least(LogLevel::Warn);
        assert_eq!(serious.len(), 2);
        assert_eq!(serious[0].message, "skipped library");
    }

    #[test]
    fn test_event_logger_publishes() {
        let bus = Arc::new(EventBus::new());
        let sub = bus.subscribe();
        let logger = EventLogger::new(bus);

        logger.log(Diagnostic::new(LogLevel::Error, "missing manifest").at(Path::new("libs/a")));

        assert_eq!(
            sub.drain(),
            vec![Event::Diagnostic {
                level: LogLevel::Error,
                message: "libs/a: missing manifest".to_string(),
            }]
        );
    }
}
