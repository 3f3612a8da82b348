//! # PID module
//!
//! This module provides the PID (plus feedforward) controller used for every closed loop in the
//! robot: drive train velocity and position control, and vision centering.
//!
//! A [`PidHandler`] is time-aware, it reads the injected [`Timer`] on every call so there is no need
//! to pass in a delta-time value. Handlers are never shared between axes, and are rebuilt rather
//! than reconfigured whenever a controller's gains change.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::rc::Rc;
use serde::{Deserialize, Serialize};

// Internal
use eqpt_if::eqpt::timer::Timer;
use util::maths::enforce_range;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains and output limits of a PID controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    /// Proportional gain
    pub kp: f64,

    /// Integral gain
    pub ki: f64,

    /// Derivative gain
    pub kd: f64,

    /// Feedforward gain, multiplies the setpoint
    pub kf: f64,

    /// Scale of the measured velocity, the value which corresponds to a
    /// setpoint of 1.0.
    ///
    /// Units: ticks/second
    pub ks: f64,

    /// Cross-coupling gain, multiplies the sync error
    pub kcc: f64,

    /// Minimum output
    pub min: f64,

    /// Maximum output
    pub max: f64,
}

/// A PID controller
pub struct PidHandler {
    gains: PidGains,

    timer: Rc<dyn Timer>,

    /// Timer value at the previous call
    prev_time_s: Option<f64>,

    /// Previous error
    prev_error: Option<f64>,

    /// Previous measured ticks, only used by the velocity calculation
    prev_ticks: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            kf: 0.0,
            ks: 1.0,
            kcc: 0.0,
            min: -1.0,
            max: 1.0,
        }
    }
}

impl PidGains {
    /// Simple proportional-derivative gains with symmetric limits.
    pub fn pd(kp: f64, kd: f64, limit: f64) -> Self {
        Self {
            kp,
            kd,
            min: -limit,
            max: limit,
            ..Default::default()
        }
    }
}

impl PidHandler {

    /// Create a new controller with the given gains.
    pub fn new(gains: PidGains, timer: Rc<dyn Timer>) -> Self {
        Self {
            gains,
            timer,
            prev_time_s: None,
            prev_error: None,
            prev_ticks: None,
            integral: 0f64,
        }
    }

    /// Get the output driving `current_position` towards `desired_position`.
    pub fn calculate_position(
        &mut self,
        desired_position: f64,
        current_position: f64
    ) -> f64 {
        self.calculate_position_with_sync(desired_position, current_position, 0.0)
    }

    /// Get the position output with an additional cross-coupling term.
    ///
    /// `sync_error` is the divergence of this axis from the axis it is coupled
    /// to, it is added to the output scaled by `kcc`.
    pub fn calculate_position_with_sync(
        &mut self,
        desired_position: f64,
        current_position: f64,
        sync_error: f64
    ) -> f64 {
        let dt = self.step_time();
        let error = desired_position - current_position;

        self.compute(dt, desired_position, error, sync_error)
    }

    /// Get the output driving the measured velocity towards
    /// `desired_fraction`.
    ///
    /// The velocity is measured from the change in `current_ticks` since the
    /// previous call, and is divided by `ks` so that it's in the same units as
    /// the setpoint (a fraction of the maximum velocity).
    pub fn calculate_velocity(
        &mut self,
        desired_fraction: f64,
        current_ticks: f64
    ) -> f64 {
        let dt = self.step_time();

        // No velocity can be measured on the first call or without any
        // elapsed time, so it is taken as zero.
        let measured = match self.prev_ticks {
            Some(prev) if dt > 0.0 && self.gains.ks != 0.0 =>
                (current_ticks - prev) / dt / self.gains.ks,
            _ => 0.0
        };
        self.prev_ticks = Some(current_ticks);

        let error = desired_fraction - measured;

        self.compute(dt, desired_fraction, error, 0.0)
    }

    /// Read the timer and return the time since the previous call, or 0 on
    /// the first call.
    fn step_time(&mut self) -> f64 {
        let now_s = self.timer.get();

        let dt = match self.prev_time_s {
            Some(t0) => (now_s - t0).max(0.0),
            None => 0.0
        };

        self.prev_time_s = Some(now_s);

        dt
    }

    fn compute(&mut self, dt: f64, setpoint: f64, error: f64, sync_error: f64) -> f64 {
        let g = self.gains;

        // Derivative is zero without a previous error or any elapsed time
        let deriv = match self.prev_error {
            Some(e) if dt > 0.0 => (error - e) / dt,
            _ => 0f64
        };

        let output_with = |integral: f64| {
            g.kp * error
                + g.ki * integral
                + g.kd * deriv
                + g.kf * setpoint
                + g.kcc * sync_error
        };

        // Only integrate while the output is within its limits, so the
        // integral can't wind up against the rails.
        let unclamped = output_with(self.integral);
        if unclamped > g.min && unclamped < g.max {
            self.integral += error * dt;
        }

        self.prev_error = Some(error);

        enforce_range(output_with(self.integral), g.min, g.max)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use eqpt_if::eqpt::timer::ManualTimer;

    fn handler(gains: PidGains) -> (PidHandler, Rc<ManualTimer>) {
        let timer = Rc::new(ManualTimer::new(0.0));
        (PidHandler::new(gains, timer.clone()), timer)
    }

    #[test]
    fn test_first_call_has_no_derivative_or_integral() {
        let (mut pid, _) = handler(PidGains {
            kp: 0.5, ki: 10.0, kd: 10.0, min: -10.0, max: 10.0, ..Default::default()
        });

        assert_eq!(pid.calculate_position(2.0, 0.0), 1.0);
    }

    #[test]
    fn test_output_always_within_limits() {
        let (mut pid, timer) = handler(PidGains {
            kp: 3.0, ki: 2.0, kd: 0.7, kf: 0.4, kcc: 1.5, min: -0.6, max: 0.9,
            ..Default::default()
        });

        // Cheap deterministic pseudo-random sequence
        let mut seed: u64 = 12345;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as f64 / (1u64 << 31) as f64) * 2.0 - 1.0
        };

        for _ in 0..500 {
            // Occasionally don't advance time at all
            let dt = next().abs() * 0.05;
            if dt > 0.01 {
                timer.advance(dt);
            }

            let out = pid.calculate_position_with_sync(next() * 100.0, next() * 100.0, next());
            assert!(out >= -0.6 && out <= 0.9, "output {} out of range", out);

            let out = pid.calculate_velocity(next(), next() * 1e4);
            assert!(out >= -0.6 && out <= 0.9, "output {} out of range", out);
        }
    }

    #[test]
    fn test_anti_windup() {
        let (mut pid, timer) = handler(PidGains {
            kp: 0.1, ki: 1.0, min: -1.0, max: 1.0, ..Default::default()
        });

        // Hold a huge error for a long time
        for _ in 0..200 {
            assert_eq!(pid.calculate_position(100.0, 0.0), 1.0);
            timer.advance(0.02);
        }

        // The integral did not grow while saturated, so reversing the error
        // immediately moves the output off the rail in the right direction.
        let out = pid.calculate_position(0.0, 0.5);
        assert!(out < 0.0, "output {} overshot after reversal", out);
    }

    #[test]
    fn test_integral_accumulates_when_unsaturated() {
        let (mut pid, timer) = handler(PidGains {
            ki: 1.0, min: -10.0, max: 10.0, ..Default::default()
        });

        pid.calculate_position(1.0, 0.0);
        timer.advance(0.5);
        assert!((pid.calculate_position(1.0, 0.0) - 0.5).abs() < 1e-12);
        timer.advance(0.5);
        assert!((pid.calculate_position(1.0, 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_velocity_scaled_by_ks() {
        let (mut pid, timer) = handler(PidGains {
            kp: 1.0, ks: 1000.0, ..Default::default()
        });

        // First call: no measured velocity
        assert_eq!(pid.calculate_velocity(0.5, 0.0), 0.5);

        // 10 ticks in 0.02 s is 500 ticks/s, half of ks
        timer.advance(0.02);
        assert!(pid.calculate_velocity(0.5, 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_feedforward_and_cross_coupling() {
        let (mut pid, _) = handler(PidGains {
            kf: 0.2, kcc: 0.5, min: -5.0, max: 5.0, ..Default::default()
        });

        assert!((pid.calculate_position_with_sync(2.0, 2.0, 1.0) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_nan_input_gives_zero() {
        let (mut pid, _) = handler(PidGains { kp: 1.0, ..Default::default() });

        assert_eq!(pid.calculate_position(std::f64::NAN, 0.0), 0.0);
    }
}
