//! # Timed task
//!
//! Bounds a behaviour by time. The task completes once its duration has elapsed since it began,
//! whatever the wrapped task's own completion says: a wrapped task which completes early is ended
//! and the timed task then simply waits out the rest of its duration.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::rc::Rc;

use eqpt_if::eqpt::timer::Timer;

use super::{ControlTask, TaskContext};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A task with a fixed duration, standalone or wrapping another task.
pub struct TimedTask {
    duration_s: f64,
    child: Option<Box<dyn ControlTask>>,
    child_active: bool,

    timer: Option<Rc<dyn Timer>>,
    start_time_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TimedTask {
    /// Do nothing for the given duration.
    pub fn wait(duration_s: f64) -> Self {
        Self::build(duration_s, None)
    }

    /// Run `child` for exactly the given duration.
    pub fn wrap(duration_s: f64, child: Box<dyn ControlTask>) -> Self {
        Self::build(duration_s, Some(child))
    }

    fn build(duration_s: f64, child: Option<Box<dyn ControlTask>>) -> Self {
        Self {
            duration_s,
            child,
            child_active: false,
            timer: None,
            start_time_s: 0.0,
        }
    }

    fn elapsed_s(&self) -> f64 {
        match self.timer {
            Some(ref t) => t.get() - self.start_time_s,
            None => 0.0
        }
    }
}

impl ControlTask for TimedTask {
    fn begin(&mut self, ctx: &mut TaskContext) {
        let timer = ctx.timer();
        self.start_time_s = timer.get();
        self.timer = Some(timer);

        if let Some(ref mut c) = self.child {
            c.begin(ctx);
            self.child_active = true;
        }
    }

    fn should_cancel(&mut self, ctx: &mut TaskContext) -> bool {
        match self.child {
            Some(ref mut c) if self.child_active => {
                if c.should_cancel(ctx) {
                    c.end(ctx);
                    self.child_active = false;
                    return true
                }
                false
            },
            _ => false
        }
    }

    fn has_completed(&mut self, ctx: &mut TaskContext) -> bool {
        if self.elapsed_s() >= self.duration_s {
            return true
        }

        if let Some(ref mut c) = self.child {
            if self.child_active && c.has_completed(ctx) {
                c.end(ctx);
                self.child_active = false;
            }
        }

        false
    }

    fn update(&mut self, ctx: &mut TaskContext) {
        if let Some(ref mut c) = self.child {
            if self.child_active {
                c.update(ctx);
            }
        }
    }

    fn end(&mut self, ctx: &mut TaskContext) {
        if let Some(ref mut c) = self.child {
            if self.child_active {
                c.end(ctx);
                self.child_active = false;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
