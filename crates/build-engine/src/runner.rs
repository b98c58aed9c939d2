//! Build Runner
//!
//! Sequences heterogeneous tasks through their lifecycle.

use std::sync::Arc;
use std::time::{Duration, Instant};
use r_droid_core::{Event, EventBus};
use tracing::{info, debug, error};

use crate::{BuildError, BuildType, Task, TaskState, TrackedTask};

/// Outcome of one task in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// Task name
    pub name: String,
    /// State the task ended in
    pub state: TaskState,
    /// Time spent in the run phase
    pub duration: Duration,
}

/// Build runner that prepares and runs tasks in order
pub struct TaskRunner<'a> {
    tasks: Vec<TrackedTask<Box<dyn Task + 'a>>>,
    events: Option<Arc<EventBus>>,
}

impl<'a> TaskRunner<'a> {
    /// Create an empty runner
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            events: None,
        }
    }

    /// Publish task events on `bus`
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    /// Append a task
    pub fn add_task(&mut self, task: impl Task + 'a) {
        self.tasks.push(TrackedTask::new(Box::new(task)));
    }

    /// Number of queued tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no task is queued
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Current state of every task, in order
    pub fn states(&self) -> Vec<(String, TaskState)> {
        self.tasks
            .iter()
            .map(|t| (t.name().to_string(), t.state()))
            .collect()
    }

    /// Prepare every task, then run them in order
    ///
    /// Stops at the first failing task; tasks after it stay prepared but are
    /// not run.
    pub fn run(&mut self, build_type: BuildType) -> Result<Vec<TaskRecord>, BuildError> {
        info!("Running {} task(s) for a {} build", self.tasks.len(), build_type);

        for task in &mut self.tasks {
            task.prepare(build_type);
        }

        let events = self.events.clone();
        let mut records = Vec::with_capacity(self.tasks.len());
        for task in &mut self.tasks {
            let name = task.name().to_string();
            debug!("Starting task {}", name);
            emit(&events, Event::TaskStarted { name: name.clone() });

            let start = Instant::now();
            let result = task.run();
            let duration = start.elapsed();

            match result {
                Ok(()) => {
                    info!("Task {} completed in {:.2}s", name, duration.as_secs_f64());
                    emit(&events, Event::TaskCompleted {
                        name: name.clone(),
                        duration_ms: duration.as_millis() as u64,
                    });
                    records.push(TaskRecord { name, state: task.state(), duration });
                }
                Err(e) => {
                    error!("Task {} failed: {}", name, e);
                    emit(&events, Event::TaskFailed {
                        name: name.clone(),
                        message: e.to_string(),
                    });
                    return Err(BuildError::TaskFailed {
                        task: name,
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(records)
    }
}

fn emit(events: &Option<Arc<EventBus>>, event: Event) {
    if let Some(bus) = events {
        bus.emit(event);
    }
}

impl Default for TaskRunner<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StepTask {
        name: &'static str,
        fail: bool,
        log: Vec<&'static str>,
    }

    impl Task for StepTask {
        fn name(&self) -> &str {
            self.name
        }

        fn prepare(&mut self, _build_type: BuildType) {
            self.log.push("prepare");
        }

        fn run(&mut self) -> Result<(), BuildError> {
            self.log.push("run");
            if self.fail {
                Err(BuildError::CompilationFailed(format!("{} broke", self.name)))
            } else {
                Ok(())
            }
        }
    }

    fn step(name: &'static str, fail: bool) -> StepTask {
        StepTask { name, fail, log: Vec::new() }
    }

    #[test]
    fn test_runs_tasks_in_order() {
        let bus = Arc::new(EventBus::new());
        let events = bus.subscribe();

        let mut runner = TaskRunner::new().with_events(bus);
        runner.add_task(step("First", false));
        runner.add_task(step("Second", false));

        let records = runner.run(BuildType::Debug).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "First");
        assert!(records.iter().all(|r| r.state == TaskState::Completed));

        let names: Vec<String> = events
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                Event::TaskStarted { name } => Some(name),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[test]
    fn test_stops_at_first_failure() {
        let mut runner = TaskRunner::new();
        runner.add_task(step("Compile", true));
        runner.add_task(step("Package", false));

        let err = runner.run(BuildType::Release).unwrap_err();
        match err {
            BuildError::TaskFailed { task, source } => {
                assert_eq!(task, "Compile");
                assert!(matches!(*source, BuildError::CompilationFailed(_)));
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(
            runner.states(),
            vec![
                ("Compile".to_string(), TaskState::Failed),
                ("Package".to_string(), TaskState::Prepared),
            ]
        );
    }
}
