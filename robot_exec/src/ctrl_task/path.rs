//! # Path following
//!
//! A path is a pair of trapezoidal velocity profiles, one per side of the drive train. Both sides
//! share the timing of the side with the furthest to travel, the other side is a scaled copy, so
//! the two finish together.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::rc::Rc;

use log::{debug, trace};

use eqpt_if::eqpt::timer::Timer;

use super::{ControlTask, PathParams, TaskContext};
use crate::driver::{AnalogOperation, DigitalOperation, Operation};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trapezoidal velocity profile over a positive distance.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Trapezoid {
    distance: f64,
    accel: f64,
    peak_velocity: f64,
    accel_time_s: f64,
    cruise_time_s: f64,
}

/// Pre-computed left/right profile of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathProfile {
    /// Units: inches
    left_distance_in: f64,

    /// Units: inches
    right_distance_in: f64,

    /// Profile of the longer side
    lead: Trapezoid,
}

/// Relative position and velocity goals at an instant along a path.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PathPoint {
    /// Units: inches
    pub left_position_in: f64,

    /// Units: inches
    pub right_position_in: f64,

    /// Units: inches/second
    pub left_velocity_ips: f64,

    /// Units: inches/second
    pub right_velocity_ips: f64,
}

/// Follow a path in path mode.
pub struct FollowPathTask {
    profile: PathProfile,

    left_start_in: f64,
    right_start_in: f64,
    start_time_s: f64,

    timer: Option<Rc<dyn Timer>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Trapezoid {
    fn new(distance: f64, max_velocity: f64, max_accel: f64) -> Self {
        let distance = distance.abs();

        if distance == 0.0 || max_velocity <= 0.0 || max_accel <= 0.0 {
            return Self {
                distance,
                accel: max_accel.max(0.0),
                peak_velocity: 0.0,
                accel_time_s: 0.0,
                cruise_time_s: 0.0,
            }
        }

        // Distance covered while accelerating to max velocity and back down
        let ramp_distance = max_velocity * max_velocity / max_accel;

        if distance <= ramp_distance {
            // Triangle, max velocity is never reached
            let accel_time_s = (distance / max_accel).sqrt();
            Self {
                distance,
                accel: max_accel,
                peak_velocity: max_accel * accel_time_s,
                accel_time_s,
                cruise_time_s: 0.0,
            }
        }
        else {
            Self {
                distance,
                accel: max_accel,
                peak_velocity: max_velocity,
                accel_time_s: max_velocity / max_accel,
                cruise_time_s: (distance - ramp_distance) / max_velocity,
            }
        }
    }

    fn duration_s(&self) -> f64 {
        2.0 * self.accel_time_s + self.cruise_time_s
    }

    /// Position and velocity at time `t`.
    fn sample(&self, t: f64) -> (f64, f64) {
        if self.peak_velocity == 0.0 {
            return (self.distance, 0.0)
        }

        let t = t.max(0.0);
        let decel_start_s = self.accel_time_s + self.cruise_time_s;
        let ramp = 0.5 * self.accel * self.accel_time_s * self.accel_time_s;

        if t < self.accel_time_s {
            (0.5 * self.accel * t * t, self.accel * t)
        }
        else if t < decel_start_s {
            let dt = t - self.accel_time_s;
            (ramp + self.peak_velocity * dt, self.peak_velocity)
        }
        else if t < self.duration_s() {
            let dt = t - decel_start_s;
            let pos = ramp
                + self.peak_velocity * self.cruise_time_s
                + self.peak_velocity * dt
                - 0.5 * self.accel * dt * dt;
            (pos.min(self.distance), self.peak_velocity - self.accel * dt)
        }
        else {
            (self.distance, 0.0)
        }
    }
}

impl PathProfile {
    /// Build a profile moving each side by the given distance.
    pub fn new(
        left_distance_in: f64,
        right_distance_in: f64,
        max_velocity_ips: f64,
        max_accel_ipss: f64
    ) -> Self {
        let longest = left_distance_in.abs().max(right_distance_in.abs());

        Self {
            left_distance_in,
            right_distance_in,
            lead: Trapezoid::new(longest, max_velocity_ips, max_accel_ipss),
        }
    }

    /// A straight line of the given length.
    pub fn straight(distance_in: f64, params: &PathParams) -> Self {
        Self::new(distance_in, distance_in, params.max_velocity_ips, params.max_acceleration_ipss)
    }

    pub fn duration_s(&self) -> f64 {
        self.lead.duration_s()
    }

    /// Goals relative to the start of the path at time `t`.
    pub fn sample(&self, t: f64) -> PathPoint {
        if self.lead.distance == 0.0 {
            return PathPoint::default()
        }

        let (pos, vel) = self.lead.sample(t);
        let fraction = pos / self.lead.distance;
        let rate = vel / self.lead.distance;

        PathPoint {
            left_position_in: self.left_distance_in * fraction,
            right_position_in: self.right_distance_in * fraction,
            left_velocity_ips: self.left_distance_in * rate,
            right_velocity_ips: self.right_distance_in * rate,
        }
    }
}

impl FollowPathTask {
    pub fn new(profile: PathProfile) -> Self {
        Self {
            profile,
            left_start_in: 0.0,
            right_start_in: 0.0,
            start_time_s: 0.0,
            timer: None,
        }
    }

    pub fn owned_operations() -> Vec<Operation> {
        vec![
            DigitalOperation::DriveTrainUsePathMode.into(),
            AnalogOperation::DriveTrainLeftPosition.into(),
            AnalogOperation::DriveTrainRightPosition.into(),
            AnalogOperation::DriveTrainLeftVelocity.into(),
            AnalogOperation::DriveTrainRightVelocity.into(),
        ]
    }

    fn elapsed_s(&self) -> f64 {
        match self.timer {
            Some(ref t) => t.get() - self.start_time_s,
            None => 0.0
        }
    }
}

impl ControlTask for FollowPathTask {
    fn begin(&mut self, ctx: &mut TaskContext) {
        let drive_train = ctx.drive_train();
        let timer = ctx.timer();

        self.left_start_in = drive_train.left_encoder_distance();
        self.right_start_in = drive_train.right_encoder_distance();
        self.start_time_s = timer.get();
        self.timer = Some(timer);

        debug!("Following path, duration {:.2} s", self.profile.duration_s());
    }

    fn update(&mut self, ctx: &mut TaskContext) {
        let p = self.profile.sample(self.elapsed_s());
        trace!("Path point: {:?}", p);

        ctx.set_digital(DigitalOperation::DriveTrainUsePathMode, true);
        ctx.set_analog(
            AnalogOperation::DriveTrainLeftPosition, self.left_start_in + p.left_position_in
        );
        ctx.set_analog(
            AnalogOperation::DriveTrainRightPosition, self.right_start_in + p.right_position_in
        );
        ctx.set_analog(AnalogOperation::DriveTrainLeftVelocity, p.left_velocity_ips);
        ctx.set_analog(AnalogOperation::DriveTrainRightVelocity, p.right_velocity_ips);
    }

    fn end(&mut self, ctx: &mut TaskContext) {
        ctx.set_digital(DigitalOperation::DriveTrainUsePathMode, false);
        ctx.set_analog(AnalogOperation::DriveTrainLeftVelocity, 0.0);
        ctx.set_analog(AnalogOperation::DriveTrainRightVelocity, 0.0);
    }

    fn has_completed(&mut self, _ctx: &mut TaskContext) -> bool {
        self.elapsed_s() >= self.profile.duration_s()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::ctrl_task::{TaskRunner, TaskState};
    use crate::testing::TestRig;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_trapezoid_with_cruise() {
        // 1 s to reach 60 in/s covering 30 in, then 1 s cruising over 60 in
        let p = PathProfile::new(120.0, 120.0, 60.0, 60.0);
        assert!(close(p.duration_s(), 3.0));

        let mid = p.sample(1.5);
        assert!(close(mid.left_position_in, 60.0));
        assert!(close(mid.left_velocity_ips, 60.0));

        let end = p.sample(3.0);
        assert!(close(end.left_position_in, 120.0));
        assert_eq!(end.left_velocity_ips, 0.0);

        // Sampling past the end holds the final point
        assert_eq!(p.sample(10.0), end);
    }

    #[test]
    fn test_triangle_profile() {
        let p = PathProfile::new(10.0, 10.0, 60.0, 40.0);

        // Peak at half way, never reaching max velocity
        let t_half = p.duration_s() / 2.0;
        let mid = p.sample(t_half);
        assert!(close(mid.left_position_in, 5.0));
        assert!(mid.left_velocity_ips < 60.0);
        assert!(close(t_half, (10.0f64 / 40.0).sqrt()));
    }

    #[test]
    fn test_shorter_side_is_scaled() {
        let p = PathProfile::new(48.0, -24.0, 60.0, 40.0);

        for i in 0..=20 {
            let t = p.duration_s() * (i as f64) / 20.0;
            let s = p.sample(t);

            assert!(close(s.right_position_in, -0.5 * s.left_position_in));
            assert!(close(s.right_velocity_ips, -0.5 * s.left_velocity_ips));
        }
    }

    #[test]
    fn test_zero_length_path() {
        let p = PathProfile::new(0.0, 0.0, 60.0, 40.0);
        assert_eq!(p.duration_s(), 0.0);
        assert_eq!(p.sample(1.0), PathPoint::default());
    }

    #[test]
    fn test_follow_path_offsets_from_start() {
        let rig = TestRig::new();
        rig.drive.set_positions(100.0, 50.0);

        let profile = PathProfile::new(120.0, 120.0, 60.0, 60.0);
        let mut runner = TaskRunner::new(Box::new(FollowPathTask::new(profile)));
        let mut values = rig.values();

        assert_eq!(rig.step_with(&mut runner, &mut values), TaskState::Running);
        assert!(values.digital(DigitalOperation::DriveTrainUsePathMode));
        assert!(close(values.analog(AnalogOperation::DriveTrainLeftPosition), 100.0));

        rig.timer.advance(1.5);
        assert_eq!(rig.step_with(&mut runner, &mut values), TaskState::Running);
        assert!(close(values.analog(AnalogOperation::DriveTrainLeftPosition), 160.0));
        assert!(close(values.analog(AnalogOperation::DriveTrainRightPosition), 110.0));
        assert!(close(values.analog(AnalogOperation::DriveTrainRightVelocity), 60.0));

        rig.timer.advance(1.5);
        assert_eq!(rig.step_with(&mut runner, &mut values), TaskState::Completed);
        assert!(!values.digital(DigitalOperation::DriveTrainUsePathMode));
        assert_eq!(values.analog(AnalogOperation::DriveTrainLeftVelocity), 0.0);
    }
}
