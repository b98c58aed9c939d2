//! CLI commands for R-Droid resgen
//!
//! Each command owns its options and runs the matching build task.

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Context, Result};
use tracing::{debug, info};

use r_droid_build_engine::{
    AndroidModule, BuildType, EventLogger, MergeSymbolsTask, TaskRecord, TaskRunner,
};
use r_droid_core::{AppConfig, Event, EventBus};

/// Merge library symbol tables into per-package R.java files
#[derive(Debug, Clone)]
pub struct MergeSymbolsCommand {
    /// Module build directory
    pub build_dir: PathBuf,
    /// The application's own package
    pub package: String,
    /// Library directories
    pub libraries: Vec<PathBuf>,
    /// Build type handed to the task
    pub build_type: BuildType,
    /// Regenerate every package regardless of the cache
    pub full: bool,
}

impl MergeSymbolsCommand {
    /// Execute the merge
    pub async fn execute(&self, config: &AppConfig) -> Result<Vec<TaskRecord>> {
        let mut settings = config.build.clone();
        if self.full {
            settings.incremental = false;
        }

        info!(
            "Merging symbols of {} librar{} for {}",
            self.libraries.len(),
            if self.libraries.len() == 1 { "y" } else { "ies" },
            self.package
        );

        let bus = Arc::new(EventBus::new());
        let events = bus.subscribe();
        let command = self.clone();

        // The merge is synchronous file I/O
        let records = tokio::task::spawn_blocking(move || {
            let mut module =
                AndroidModule::with_settings(command.package, command.build_dir, &settings)
                    .with_libraries(command.libraries);
            let logger = EventLogger::new(Arc::clone(&bus));

            let mut runner = TaskRunner::new().with_events(bus);
            runner.add_task(MergeSymbolsTask::new(&mut module, settings, &logger));
            runner.run(command.build_type)
        })
        .await
        .context("merge task panicked")?
        .context("symbol merge failed")?;

        for event in events.drain() {
            if let Event::TaskCompleted { name, duration_ms } = event {
                debug!("{} finished in {} ms", name, duration_ms);
            }
        }
        Ok(records)
    }
}
