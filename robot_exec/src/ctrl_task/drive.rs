//! # Drive tasks
//!
//! Tasks which move the drive train by a fixed amount using the encoder positions captured when
//! they begin.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::rc::Rc;

use log::debug;

use eqpt_if::eqpt::{drive::DriveTrainEqpt, timer::Timer};

use super::{ControlTask, TaskContext};
use crate::driver::{AnalogOperation, DigitalOperation, Operation};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Move each side of the drive train by a fixed distance using position mode.
///
/// Completes once both sides have reached their targets, or once the timeout
/// elapses if one was given.
pub struct MoveDistanceOneShotTask {
    /// Units: inches
    left_delta_in: f64,

    /// Units: inches
    right_delta_in: f64,

    timeout_s: Option<f64>,

    left_target_in: f64,
    right_target_in: f64,
    start_time_s: f64,

    drive_train: Option<Rc<dyn DriveTrainEqpt>>,
    timer: Option<Rc<dyn Timer>>,
}

/// Hold the drive train where it is using the brake gains.
///
/// Never completes, the owning macro ends it.
#[derive(Default)]
pub struct PidBrakeTask {
    left_hold_in: f64,
    right_hold_in: f64,
}

/// Drive forward at a fixed speed in velocity mode until either side has
/// covered the distance.
pub struct DriveDistanceTask {
    /// Fraction of maximum velocity, the sign gives the direction
    speed: f64,

    /// Units: inches
    distance_in: f64,

    timeout_s: Option<f64>,

    left_start_in: f64,
    right_start_in: f64,
    start_time_s: f64,

    drive_train: Option<Rc<dyn DriveTrainEqpt>>,
    timer: Option<Rc<dyn Timer>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MoveDistanceOneShotTask {
    pub fn new(left_delta_in: f64, right_delta_in: f64, timeout_s: Option<f64>) -> Self {
        Self {
            left_delta_in,
            right_delta_in,
            timeout_s,
            left_target_in: 0.0,
            right_target_in: 0.0,
            start_time_s: 0.0,
            drive_train: None,
            timer: None,
        }
    }

    /// Operations this task writes.
    pub fn owned_operations() -> Vec<Operation> {
        vec![
            DigitalOperation::DriveTrainUsePositionalMode.into(),
            AnalogOperation::DriveTrainLeftPosition.into(),
            AnalogOperation::DriveTrainRightPosition.into(),
        ]
    }
}

impl ControlTask for MoveDistanceOneShotTask {
    fn begin(&mut self, ctx: &mut TaskContext) {
        let drive_train = ctx.drive_train();
        let timer = ctx.timer();

        self.left_target_in = drive_train.left_encoder_distance() + self.left_delta_in;
        self.right_target_in = drive_train.right_encoder_distance() + self.right_delta_in;
        self.start_time_s = timer.get();

        debug!(
            "Moving to left {:.2} in, right {:.2} in",
            self.left_target_in, self.right_target_in
        );

        self.drive_train = Some(drive_train);
        self.timer = Some(timer);
    }

    fn update(&mut self, ctx: &mut TaskContext) {
        ctx.set_digital(DigitalOperation::DriveTrainUsePositionalMode, true);
        ctx.set_analog(AnalogOperation::DriveTrainLeftPosition, self.left_target_in);
        ctx.set_analog(AnalogOperation::DriveTrainRightPosition, self.right_target_in);
    }

    fn end(&mut self, ctx: &mut TaskContext) {
        ctx.set_digital(DigitalOperation::DriveTrainUsePositionalMode, false);
        ctx.set_analog(AnalogOperation::DriveTrainLeftPosition, 0.0);
        ctx.set_analog(AnalogOperation::DriveTrainRightPosition, 0.0);
    }

    fn has_completed(&mut self, _ctx: &mut TaskContext) -> bool {
        if let (Some(t), Some(timeout)) = (&self.timer, self.timeout_s) {
            if t.get() - self.start_time_s >= timeout {
                debug!("Move distance timed out");
                return true
            }
        }

        let drive_train = match self.drive_train {
            Some(ref d) => d,
            None => return false
        };

        reached(self.left_delta_in, drive_train.left_encoder_distance(), self.left_target_in)
            && reached(self.right_delta_in, drive_train.right_encoder_distance(), self.right_target_in)
    }
}

impl PidBrakeTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owned_operations() -> Vec<Operation> {
        vec![
            DigitalOperation::DriveTrainUsePositionalMode.into(),
            DigitalOperation::DriveTrainUseBrakeMode.into(),
            AnalogOperation::DriveTrainLeftPosition.into(),
            AnalogOperation::DriveTrainRightPosition.into(),
        ]
    }
}

impl ControlTask for PidBrakeTask {
    fn begin(&mut self, ctx: &mut TaskContext) {
        let drive_train = ctx.drive_train();
        self.left_hold_in = drive_train.left_encoder_distance();
        self.right_hold_in = drive_train.right_encoder_distance();
    }

    fn update(&mut self, ctx: &mut TaskContext) {
        ctx.set_digital(DigitalOperation::DriveTrainUsePositionalMode, true);
        ctx.set_digital(DigitalOperation::DriveTrainUseBrakeMode, true);
        ctx.set_analog(AnalogOperation::DriveTrainLeftPosition, self.left_hold_in);
        ctx.set_analog(AnalogOperation::DriveTrainRightPosition, self.right_hold_in);
    }

    fn end(&mut self, ctx: &mut TaskContext) {
        ctx.set_digital(DigitalOperation::DriveTrainUseBrakeMode, false);
        ctx.set_digital(DigitalOperation::DriveTrainUsePositionalMode, false);
    }

    fn has_completed(&mut self, _ctx: &mut TaskContext) -> bool {
        false
    }
}

impl DriveDistanceTask {
    pub fn new(speed: f64, distance_in: f64, timeout_s: Option<f64>) -> Self {
        Self {
            speed,
            distance_in: distance_in.abs(),
            timeout_s,
            left_start_in: 0.0,
            right_start_in: 0.0,
            start_time_s: 0.0,
            drive_train: None,
            timer: None,
        }
    }

    pub fn owned_operations() -> Vec<Operation> {
        vec![
            DigitalOperation::DriveTrainUsePositionalMode.into(),
            AnalogOperation::DriveTrainMoveForward.into(),
            AnalogOperation::DriveTrainTurn.into(),
        ]
    }
}

impl ControlTask for DriveDistanceTask {
    fn begin(&mut self, ctx: &mut TaskContext) {
        let drive_train = ctx.drive_train();
        let timer = ctx.timer();

        self.left_start_in = drive_train.left_encoder_distance();
        self.right_start_in = drive_train.right_encoder_distance();
        self.start_time_s = timer.get();

        self.drive_train = Some(drive_train);
        self.timer = Some(timer);
    }

    fn update(&mut self, ctx: &mut TaskContext) {
        ctx.set_digital(DigitalOperation::DriveTrainUsePositionalMode, false);
        ctx.set_analog(AnalogOperation::DriveTrainMoveForward, self.speed);
        ctx.set_analog(AnalogOperation::DriveTrainTurn, 0.0);
    }

    fn end(&mut self, ctx: &mut TaskContext) {
        ctx.set_analog(AnalogOperation::DriveTrainMoveForward, 0.0);
        ctx.set_analog(AnalogOperation::DriveTrainTurn, 0.0);
    }

    fn has_completed(&mut self, _ctx: &mut TaskContext) -> bool {
        if let (Some(t), Some(timeout)) = (&self.timer, self.timeout_s) {
            if t.get() - self.start_time_s >= timeout {
                debug!("Drive distance timed out");
                return true
            }
        }

        match self.drive_train {
            Some(ref d) => {
                let left = (d.left_encoder_distance() - self.left_start_in).abs();
                let right = (d.right_encoder_distance() - self.right_start_in).abs();

                left >= self.distance_in || right >= self.distance_in
            },
            None => false
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Whether `current` is at or beyond `target` in the direction of travel.
fn reached(delta: f64, current: f64, target: f64) -> bool {
    if delta >= 0.0 {
        current >= target
    }
    else {
        current <= target
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

    #[test]
    fn test_one_shot_targets_from_baseline() {
        let rig = TestRig::new();
        rig.drive.set_positions(10.0, 20.0);

        let mut runner = TaskRunner::new(Box::new(MoveDistanceOneShotTask::new(5.0, -5.0, None)));
        let mut values = rig.values();

        assert_eq!(rig.step_with(&mut runner, &mut values), TaskState::Running);
        assert_eq!(values.analog(AnalogOperation::DriveTrainLeftPosition), 15.0);
        assert_eq!(values.analog(AnalogOperation::DriveTrainRightPosition), 15.0);
        assert!(values.digital(DigitalOperation::DriveTrainUsePositionalMode));

        // Only one side there is not enough
        rig.drive.set_positions(15.0, 17.0);
        assert_eq!(rig.step_with(&mut runner, &mut values), TaskState::Running);

        // Overshooting counts as reached, in each side's own direction
        rig.drive.set_positions(15.5, 14.0);
        assert_eq!(rig.step_with(&mut runner, &mut values), TaskState::Completed);
        assert!(!values.digital(DigitalOperation::DriveTrainUsePositionalMode));
    }

    #[test]
    fn test_one_shot_timeout() {
        let rig = TestRig::new();
        let mut runner = TaskRunner::new(Box::new(
            MoveDistanceOneShotTask::new(100.0, 100.0, Some(1.0))
        ));

        assert_eq!(rig.step(&mut runner), TaskState::Running);
        rig.timer.advance(0.5);
        assert_eq!(rig.step(&mut runner), TaskState::Running);
        rig.timer.advance(0.5);
        assert_eq!(rig.step(&mut runner), TaskState::Completed);
    }

    #[test]
    fn test_brake_holds_begin_position() {
        let rig = TestRig::new();
        rig.drive.set_positions(3.0, 4.0);

        let mut runner = TaskRunner::new(Box::new(PidBrakeTask::new()));
        let mut values = rig.values();

        for _ in 0..5 {
            assert_eq!(rig.step_with(&mut runner, &mut values), TaskState::Running);
            rig.drive.set_positions(6.0, 1.0);
        }
        assert!(values.digital(DigitalOperation::DriveTrainUseBrakeMode));
        assert_eq!(values.analog(AnalogOperation::DriveTrainLeftPosition), 3.0);
        assert_eq!(values.analog(AnalogOperation::DriveTrainRightPosition), 4.0);

        rig.cancel_with(&mut runner, &mut values);
        assert!(!values.digital(DigitalOperation::DriveTrainUseBrakeMode));
        assert!(!values.digital(DigitalOperation::DriveTrainUsePositionalMode));
    }

    #[test]
    fn test_drive_distance_either_side() {
        let rig = TestRig::new();
        let mut runner = TaskRunner::new(Box::new(DriveDistanceTask::new(-0.4, 24.0, None)));
        let mut values = rig.values();

        assert_eq!(rig.step_with(&mut runner, &mut values), TaskState::Running);
        assert_eq!(values.analog(AnalogOperation::DriveTrainMoveForward), -0.4);

        rig.drive.set_positions(-20.0, -23.9);
        assert_eq!(rig.step_with(&mut runner, &mut values), TaskState::Running);
        rig.drive.set_positions(-20.0, -24.0);
        assert_eq!(rig.step_with(&mut runner, &mut values), TaskState::Completed);
        assert_eq!(values.analog(AnalogOperation::DriveTrainMoveForward), 0.0);
    }
}
