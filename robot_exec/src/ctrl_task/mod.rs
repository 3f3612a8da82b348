//! # Control task module
//!
//! A control task is a stateful behaviour which writes operations through a [`TaskContext`] for as
//! long as it is running. Each task instance is used for exactly one activation: a [`TaskRunner`]
//! moves it `NotStarted -> Running -> {Completed, Canceled}` and it is then discarded.
//!
//! While running, the checks made each cycle are (in order):
//!
//! 1. `should_cancel` - if true the task is canceled,
//! 2. `has_completed` - if true the task is completed,
//! 3. otherwise `update` writes this cycle's values.
//!
//! `begin` runs once on entering `Running` and `end` runs once on leaving it, whichever terminal
//! state is reached and even if the task was canceled from outside before it ever updated.
//!
//! Composite tasks ([`SequentialTask`], [`ParallelTask`], [`TimedTask`]) hold the tasks they wrap
//! and drive them with the same calls.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod auto;
pub mod compose;
pub mod drive;
mod params;
pub mod path;
pub mod timed;
pub mod vision_centering;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;

pub use compose::{ParallelPolicy, ParallelTask, SequentialTask};
pub use params::*;
pub use timed::TimedTask;

pub use crate::driver::TaskContext;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A behaviour run by the driver.
pub trait ControlTask {
    /// Called once when the task starts, acquire collaborators and capture
    /// baselines here.
    fn begin(&mut self, ctx: &mut TaskContext);

    /// Write this cycle's values for the owned operations.
    fn update(&mut self, ctx: &mut TaskContext);

    /// Called once when the task stops, must return owned operations to safe
    /// defaults.
    fn end(&mut self, ctx: &mut TaskContext);

    /// Task specific abort condition.
    fn should_cancel(&mut self, _ctx: &mut TaskContext) -> bool {
        false
    }

    /// Task specific success condition.
    fn has_completed(&mut self, ctx: &mut TaskContext) -> bool;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    NotStarted,
    Running,
    Completed,
    Canceled,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drives a single task through its lifecycle.
pub struct TaskRunner {
    task: Box<dyn ControlTask>,
    state: TaskState,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Canceled)
    }
}

impl TaskRunner {
    pub fn new(task: Box<dyn ControlTask>) -> Self {
        Self {
            task,
            state: TaskState::NotStarted,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Run one cycle of the task, beginning it if this is the first cycle.
    ///
    /// Terminal tasks are left alone.
    pub fn step(&mut self, ctx: &mut TaskContext) -> TaskState {
        if self.state == TaskState::NotStarted {
            self.task.begin(ctx);
            self.state = TaskState::Running;
        }

        if self.state != TaskState::Running {
            return self.state
        }

        if self.task.should_cancel(ctx) {
            trace!("Task canceled itself");
            self.finish(ctx, TaskState::Canceled);
        }
        else if self.task.has_completed(ctx) {
            trace!("Task completed");
            self.finish(ctx, TaskState::Completed);
        }
        else {
            self.task.update(ctx);
        }

        self.state
    }

    /// Cancel the task from outside.
    ///
    /// A running task is ended, a task which never began is discarded without
    /// being ended.
    pub fn cancel(&mut self, ctx: &mut TaskContext) {
        match self.state {
            TaskState::Running => self.finish(ctx, TaskState::Canceled),
            TaskState::NotStarted => self.state = TaskState::Canceled,
            TaskState::Completed | TaskState::Canceled => ()
        }
    }

    fn finish(&mut self, ctx: &mut TaskContext, state: TaskState) {
        self.task.end(ctx);
        self.state = state;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
