//! # Timers
//!
//! Monotonic time sources used for PID `dt` and timed tasks.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::cell::Cell;
use std::time::Instant;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A monotonic timer.
pub trait Timer {
    /// Seconds elapsed since the timer was started or last reset.
    fn get(&self) -> f64;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Timer backed by the system's monotonic clock.
#[derive(Debug)]
pub struct WallTimer {
    start: Cell<Instant>,
}

/// Timer whose time only moves when told to, used for simulation and tests.
#[derive(Debug, Default)]
pub struct ManualTimer {
    now_s: Cell<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl WallTimer {
    pub fn new() -> Self {
        Self {
            start: Cell::new(Instant::now())
        }
    }

    /// Restart the timer from zero.
    pub fn reset(&self) {
        self.start.set(Instant::now());
    }
}

impl Default for WallTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for WallTimer {
    fn get(&self) -> f64 {
        self.start.get().elapsed().as_secs_f64()
    }
}

impl ManualTimer {
    pub fn new(start_s: f64) -> Self {
        Self {
            now_s: Cell::new(start_s)
        }
    }

    /// Jump to the given time.
    ///
    /// Moving backwards is ignored, the timer is monotonic.
    pub fn set(&self, now_s: f64) {
        if now_s >= self.now_s.get() {
            self.now_s.set(now_s);
        }
    }

    /// Move time forward by `dt_s` seconds.
    pub fn advance(&self, dt_s: f64) {
        self.set(self.now_s.get() + dt_s.max(0.0));
    }
}

impl Timer for ManualTimer {
    fn get(&self) -> f64 {
        self.now_s.get()
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
