//! # Task composition
//!
//! Sequential and parallel groups of tasks. Children are driven directly through the
//! [`ControlTask`] calls, each group tracks which of its children are still running so that every
//! child is begun and ended exactly once.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;

use super::{ControlTask, TaskContext, TaskState};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Runs children one after another.
///
/// When a child completes the next one is begun at the start of the
/// following cycle. If any child cancels the whole sequence cancels in the
/// same cycle.
pub struct SequentialTask {
    children: Vec<Box<dyn ControlTask>>,
    current: usize,

    /// The current child has been begun and not yet ended
    child_active: bool,

    /// The current child is waiting to be begun
    pending_begin: bool,
}

/// Runs children at the same time.
pub struct ParallelTask {
    policy: ParallelPolicy,
    children: Vec<Child>,
}

struct Child {
    task: Box<dyn ControlTask>,
    state: TaskState,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// When a parallel group completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelPolicy {
    /// Complete once every child has completed, any child canceling cancels
    /// the group.
    All,

    /// Complete once any child completes, the rest are ended. The group only
    /// cancels once every child has canceled.
    Any,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SequentialTask {
    pub fn new(children: Vec<Box<dyn ControlTask>>) -> Self {
        Self {
            children,
            current: 0,
            child_active: false,
            pending_begin: false,
        }
    }
}

impl ControlTask for SequentialTask {
    fn begin(&mut self, ctx: &mut TaskContext) {
        if let Some(child) = self.children.get_mut(0) {
            child.begin(ctx);
            self.child_active = true;
        }
    }

    fn should_cancel(&mut self, ctx: &mut TaskContext) -> bool {
        let child = match self.children.get_mut(self.current) {
            Some(c) => c,
            None => return false
        };

        // Start of the cycle after the previous child completed
        if self.pending_begin {
            child.begin(ctx);
            self.pending_begin = false;
            self.child_active = true;
        }

        if self.child_active && child.should_cancel(ctx) {
            debug!("Child {} of sequence canceled", self.current);
            child.end(ctx);
            self.child_active = false;
            return true
        }

        false
    }

    fn has_completed(&mut self, ctx: &mut TaskContext) -> bool {
        let child = match self.children.get_mut(self.current) {
            Some(c) => c,
            None => return true
        };

        if self.child_active && child.has_completed(ctx) {
            child.end(ctx);
            self.child_active = false;
            self.current += 1;

            if self.current >= self.children.len() {
                return true
            }

            self.pending_begin = true;
        }

        false
    }

    fn update(&mut self, ctx: &mut TaskContext) {
        if self.child_active {
            if let Some(child) = self.children.get_mut(self.current) {
                child.update(ctx);
            }
        }
    }

    fn end(&mut self, ctx: &mut TaskContext) {
        if self.child_active {
            if let Some(child) = self.children.get_mut(self.current) {
                child.end(ctx);
            }
            self.child_active = false;
        }
    }
}

impl ParallelTask {
    pub fn new(policy: ParallelPolicy, children: Vec<Box<dyn ControlTask>>) -> Self {
        Self {
            policy,
            children: children
                .into_iter()
                .map(|task| Child { task, state: TaskState::NotStarted })
                .collect(),
        }
    }

    fn end_running(&mut self, ctx: &mut TaskContext) {
        for c in self.children.iter_mut().filter(|c| c.state == TaskState::Running) {
            c.task.end(ctx);
            c.state = TaskState::Canceled;
        }
    }
}

impl ControlTask for ParallelTask {
    fn begin(&mut self, ctx: &mut TaskContext) {
        for c in self.children.iter_mut() {
            c.task.begin(ctx);
            c.state = TaskState::Running;
        }
    }

    fn should_cancel(&mut self, ctx: &mut TaskContext) -> bool {
        for c in self.children.iter_mut().filter(|c| c.state == TaskState::Running) {
            if c.task.should_cancel(ctx) {
                c.task.end(ctx);
                c.state = TaskState::Canceled;
            }
        }

        let cancel = match self.policy {
            ParallelPolicy::All =>
                self.children.iter().any(|c| c.state == TaskState::Canceled),
            ParallelPolicy::Any =>
                !self.children.is_empty()
                && self.children.iter().all(|c| c.state == TaskState::Canceled),
        };

        if cancel {
            self.end_running(ctx);
        }

        cancel
    }

    fn has_completed(&mut self, ctx: &mut TaskContext) -> bool {
        for c in self.children.iter_mut().filter(|c| c.state == TaskState::Running) {
            if c.task.has_completed(ctx) {
                c.task.end(ctx);
                c.state = TaskState::Completed;
            }
        }

        match self.policy {
            ParallelPolicy::All =>
                self.children.iter().all(|c| c.state == TaskState::Completed),
            ParallelPolicy::Any =>
                self.children.is_empty()
                || self.children.iter().any(|c| c.state == TaskState::Completed),
        }
    }

    fn update(&mut self, ctx: &mut TaskContext) {
        for c in self.children.iter_mut().filter(|c| c.state == TaskState::Running) {
            c.task.update(ctx);
        }
    }

    fn end(&mut self, ctx: &mut TaskContext) {
        self.end_running(ctx);
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
