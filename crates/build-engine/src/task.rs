//! Task lifecycle
//!
//! Every build step implements [`Task`]. A pipeline calls `prepare` with the
//! build type, then `run`. `prepare` only resolves paths and settings and may
//! be called again at any time; `run` does the I/O and is the only phase that
//! can fail.

use crate::{BuildError, BuildType};

/// A build step
pub trait Task {
    /// Stable identifier used for logging and ordering
    fn name(&self) -> &str;

    /// Resolve derived paths and configuration for `build_type`
    fn prepare(&mut self, build_type: BuildType);

    /// Perform the work
    fn run(&mut self) -> Result<(), BuildError>;
}

impl<T: Task + ?Sized> Task for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn prepare(&mut self, build_type: BuildType) {
        (**self).prepare(build_type)
    }

    fn run(&mut self) -> Result<(), BuildError> {
        (**self).run()
    }
}

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    NotStarted,
    Prepared,
    Running,
    Completed,
    Failed,
}

/// A task together with its lifecycle state
///
/// `NotStarted -> Prepared -> Running -> Completed | Failed`. Preparing a
/// finished task re-arms it for another run.
pub struct TrackedTask<T: Task> {
    task: T,
    state: TaskState,
}

impl<T: Task> TrackedTask<T> {
    /// Wrap a task that has not been prepared yet
    pub fn new(task: T) -> Self {
        Self {
            task,
            state: TaskState::NotStarted,
        }
    }

    /// Current state
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Task name
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// Access the wrapped task
    pub fn inner(&self) -> &T {
        &self.task
    }

    /// Unwrap the task
    pub fn into_inner(self) -> T {
        self.task
    }

    /// Prepare the task for `build_type`
    pub fn prepare(&mut self, build_type: BuildType) {
        self.task.prepare(build_type);
        self.state = TaskState::Prepared;
    }

    /// Run a prepared task
    pub fn run(&mut self) -> Result<(), BuildError> {
        if self.state != TaskState::Prepared {
            return Err(BuildError::InvalidState(format!(
                "task '{}' cannot run from state {:?}",
                self.task.name(),
                self.state
            )));
        }

        self.state = TaskState::Running;
        match self.task.run() {
            Ok(()) => {
                self.state = TaskState::Completed;
                Ok(())
            }
            Err(e) => {
                self.state = TaskState::Failed;
                Err(e)
            }
        }
    }
}
