//! Position, brake and path mode calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};

// Internal
use super::{
    state::{PowerSetting, POWER_LEVEL_MAX, POWER_LEVEL_MIN, TELEM_CATEGORY},
    DriveCtrl, DriveCtrlError, Side
};
use crate::driver::{AnalogOperation, Driver};
use util::maths::enforce_range;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCtrl {

    /// Drive each side to the absolute position goals.
    pub(crate) fn calc_position_mode(
        &mut self,
        driver: &Driver
    ) -> Result<PowerSetting, DriveCtrlError> {
        let left_goal = driver.get_analog(AnalogOperation::DriveTrainLeftPosition);
        let right_goal = driver.get_analog(AnalogOperation::DriveTrainRightPosition);

        self.telem.log_number(TELEM_CATEGORY, "left_position_goal", left_goal);
        self.telem.log_number(TELEM_CATEGORY, "right_position_goal", right_goal);

        let power = self.position_power(left_goal, right_goal);

        self.check_range(power)
    }

    /// Hold the positions captured on entering brake mode.
    pub(crate) fn calc_brake_mode(&mut self) -> Result<PowerSetting, DriveCtrlError> {
        let (left_goal, right_goal) = self.brake_hold_in;
        let power = self.position_power(left_goal, right_goal);

        self.check_range(power)
    }

    /// Follow the path position goals with velocity feedforward.
    pub(crate) fn calc_path_mode(
        &mut self,
        driver: &Driver
    ) -> Result<PowerSetting, DriveCtrlError> {
        let left_goal = driver.get_analog(AnalogOperation::DriveTrainLeftPosition);
        let right_goal = driver.get_analog(AnalogOperation::DriveTrainRightPosition);
        let left_vel = driver.get_analog(AnalogOperation::DriveTrainLeftVelocity);
        let right_vel = driver.get_analog(AnalogOperation::DriveTrainRightVelocity);

        let feedforward = |v: f64| if self.params.path_max_velocity_ips > 0.0 {
            self.params.path_kv * v / self.params.path_max_velocity_ips
        }
        else {
            0.0
        };
        let (left_ff, right_ff) = (feedforward(left_vel), feedforward(right_vel));

        let position = self.position_power(left_goal, right_goal);
        let max = self.params.path_max_power;

        let power = PowerSetting {
            left: enforce_range(position.left + left_ff, -max, max),
            right: enforce_range(position.right + right_ff, -max, max),
        };

        trace!("Path mode: goals ({:.2}, {:.2}) in, ({:.2}, {:.2}) in/s, power {:?}",
            left_goal, right_goal, left_vel, right_vel, power);

        self.check_range(power)
    }

    /// Power driving both sides to the given positions, closed loop if PID is
    /// enabled otherwise with the proportional fallback.
    fn position_power(&mut self, left_goal: f64, right_goal: f64) -> PowerSetting {
        let left_current = self.sensors.left_distance_in;
        let right_current = self.sensors.right_distance_in;

        let (left_sync, right_sync) = if self.params.use_cross_coupling {
            let left_error = left_goal - left_current;
            let right_error = right_goal - right_current;
            let range = self.params.cross_coupling_range_in;

            (
                outside_range(right_error - left_error, range),
                outside_range(left_error - right_error, range)
            )
        }
        else {
            (0.0, 0.0)
        };

        match (self.left_pid.as_mut(), self.right_pid.as_mut()) {
            (Some(l), Some(r)) => PowerSetting {
                left: l.calculate_position_with_sync(left_goal, left_current, left_sync),
                right: r.calculate_position_with_sync(right_goal, right_current, right_sync),
            },
            _ => PowerSetting {
                left: self.non_pid_power(left_goal - left_current),
                right: self.non_pid_power(right_goal - right_current),
            }
        }
    }

    /// Bounded proportional fallback used when PID is disabled.
    fn non_pid_power(&self, error: f64) -> f64 {
        if error.abs() < self.params.non_pid_threshold_in {
            return 0.0
        }

        enforce_range(error, POWER_LEVEL_MIN, POWER_LEVEL_MAX) * self.params.non_pid_max_power
    }

    /// Apply the range policy to a closed loop result.
    ///
    /// When exceptions are enabled an out of range power is an error,
    /// otherwise it is clamped with a warning.
    fn check_range(&self, power: PowerSetting) -> Result<PowerSetting, DriveCtrlError> {
        let left = self.check_side(Side::Left, power.left)?;
        let right = self.check_side(Side::Right, power.right)?;

        Ok(PowerSetting { left, right })
    }

    fn check_side(&self, side: Side, value: f64) -> Result<f64, DriveCtrlError> {
        if value >= POWER_LEVEL_MIN && value <= POWER_LEVEL_MAX {
            return Ok(value)
        }

        if self.throw_exceptions {
            return Err(DriveCtrlError::PowerOutOfRange {
                side,
                value,
                mode: self.mode
            })
        }

        warn!("{:?} power {} out of range in {:?} mode, clamping", side, value, self.mode);
        Ok(enforce_range(value, POWER_LEVEL_MIN, POWER_LEVEL_MAX))
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn outside_range(value: f64, range: f64) -> f64 {
    if value.abs() < range {
        0.0
    }
    else {
        value
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive_ctrl::{DriveMode, Params};
    use crate::driver::DigitalOperation;
    use crate::pid::{PidGains, PidHandler};
    use crate::testing::{scripted_driver, set_ops, RecordingTelem, TestRig};
    use std::rc::Rc;

    fn ctrl(rig: &TestRig, params: Params, throw: bool) -> DriveCtrl {
        DriveCtrl::new(
            params, throw, rig.drive.clone(), rig.timer.clone(), Rc::new(RecordingTelem::default())
        )
    }

    fn positional(left: f64, right: f64) -> (Vec<(AnalogOperation, f64)>, Vec<(DigitalOperation, bool)>) {
        (
            vec![
                (AnalogOperation::DriveTrainLeftPosition, left),
                (AnalogOperation::DriveTrainRightPosition, right),
            ],
            vec![(DigitalOperation::DriveTrainUsePositionalMode, true)]
        )
    }

    #[test]
    fn test_non_pid_fallback() {
        let rig = TestRig::new();
        let mut c = ctrl(&rig, Params { use_pid_default: false, ..Default::default() }, true);

        let (a, d) = positional(10.0, 0.05);
        let driver = scripted_driver(&rig, &a, &d);
        c.read_sensors();
        let out = c.update(&driver).unwrap();

        // Clamped to 1 then scaled by 0.2, below the threshold gives nothing
        assert!((out.left_power - 0.2).abs() < 1e-12);
        assert_eq!(out.right_power, 0.0);

        let (a, d) = positional(-0.5, 0.0);
        let driver = scripted_driver(&rig, &a, &d);
        let out = c.update(&driver).unwrap();
        assert!((out.left_power + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_range_policy() {
        let params = Params {
            position_gains: PidGains { kp: 1.0, min: -2.0, max: 2.0, ..Default::default() },
            ..Default::default()
        };
        let (a, d) = positional(10.0, 0.5);

        // Development: the violation is an error
        let rig = TestRig::new();
        let mut c = ctrl(&rig, params.clone(), true);
        let driver = scripted_driver(&rig, &a, &d);
        match c.update(&driver) {
            Err(DriveCtrlError::PowerOutOfRange { side, value, mode }) => {
                assert_eq!(side, Side::Left);
                assert_eq!(value, 2.0);
                assert_eq!(mode, DriveMode::Position);
            },
            r => panic!("Expected a range error, got {:?}", r)
        }

        // Competition: clamped and sent
        let rig = TestRig::new();
        let mut c = ctrl(&rig, params, false);
        let driver = scripted_driver(&rig, &a, &d);
        let out = c.update(&driver).unwrap();
        assert_eq!(out.left_power, 1.0);
        assert!((out.right_power - 0.5).abs() < 1e-12);
        assert_eq!(rig.drive.powers(), (1.0, out.right_power));
    }

    #[test]
    fn test_mode_switch_rebuilds_pid() {
        let params = Params {
            position_gains: PidGains { kp: 0.05, ki: 0.2, kd: 0.01, min: -0.6, max: 0.6, ..Default::default() },
            ..Default::default()
        };
        let (a, d) = positional(8.0, 4.0);

        // Run position mode, drop into velocity for a cycle, and come back
        let rig = TestRig::new();
        let mut c = ctrl(&rig, params.clone(), true);
        let mut driver = scripted_driver(&rig, &a, &d);
        for _ in 0..5 {
            c.update(&driver).unwrap();
            rig.timer.advance(0.02);
        }
        set_ops(&mut driver, &[], &[]);
        c.update(&driver).unwrap();
        rig.timer.advance(0.02);
        set_ops(&mut driver, &a, &d);

        let mut after_switch = Vec::new();
        for _ in 0..5 {
            after_switch.push(c.update(&driver).unwrap().left_power);
            rig.timer.advance(0.02);
        }

        // Same as a handler which has never run
        let fresh_rig = TestRig::new();
        let mut fresh = PidHandler::new(params.position_gains, fresh_rig.timer.clone());
        let expected: Vec<f64> = (0..5).map(|_| {
            let p = fresh.calculate_position(8.0, 0.0);
            fresh_rig.timer.advance(0.02);
            p
        }).collect();

        for (a, e) in after_switch.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-12, "{} != {}", a, e);
        }
    }

    #[test]
    fn test_brake_holds_entry_position() {
        let rig = TestRig::new();
        let mut c = ctrl(&rig, Params::default(), true);
        rig.drive.set_positions(5.0, 5.0);
        c.read_sensors();

        let driver = scripted_driver(&rig, &[
            (AnalogOperation::DriveTrainLeftPosition, 100.0),
            (AnalogOperation::DriveTrainRightPosition, 100.0),
        ], &[
            (DigitalOperation::DriveTrainUsePositionalMode, true),
            (DigitalOperation::DriveTrainUseBrakeMode, true),
        ]);
        let out = c.update(&driver).unwrap();
        assert_eq!(out.mode, DriveMode::Brake);
        assert_eq!(out.left_power, 0.0);

        // Pushed forward an inch, brake pulls back
        rig.drive.set_positions(6.0, 5.0);
        c.read_sensors();
        rig.timer.advance(0.02);
        let out = c.update(&driver).unwrap();
        assert!((out.left_power + 0.1).abs() < 1e-12);
        assert_eq!(out.right_power, 0.0);
    }

    #[test]
    fn test_path_feedforward() {
        let rig = TestRig::new();
        let mut c = ctrl(&rig, Params::default(), true);

        let driver = scripted_driver(&rig, &[
            (AnalogOperation::DriveTrainLeftPosition, 0.0),
            (AnalogOperation::DriveTrainRightPosition, 10.0),
            (AnalogOperation::DriveTrainLeftVelocity, 60.0),
            (AnalogOperation::DriveTrainRightVelocity, 240.0),
        ], &[(DigitalOperation::DriveTrainUsePathMode, true)]);
        let out = c.update(&driver).unwrap();

        // 60/120 feedforward only on the left, capped at the path max power on
        // the right
        assert!((out.left_power - 0.5).abs() < 1e-12);
        assert!((out.right_power - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_cross_coupling_sync() {
        let rig = TestRig::new();
        let params = Params {
            use_cross_coupling: true,
            position_gains: PidGains { kp: 0.05, kcc: 0.01, min: -1.0, max: 1.0, ..Default::default() },
            ..Default::default()
        };
        let mut c = ctrl(&rig, params, true);
        rig.drive.set_positions(0.0, 5.0);
        c.read_sensors();

        let (a, d) = positional(10.0, 10.3);
        let driver = scripted_driver(&rig, &a, &d);
        let out = c.update(&driver).unwrap();

        // Left error 10, right error 5.3
        assert!((out.left_power - (0.05 * 10.0 + 0.01 * (5.3 - 10.0))).abs() < 1e-9);
        assert!((out.right_power - (0.05 * 5.3 + 0.01 * (10.0 - 5.3))).abs() < 1e-9);

        // Within the range both syncs are ignored
        let (a, d) = positional(10.0, 15.2);
        let driver = scripted_driver(&rig, &a, &d);
        let mut c = ctrl(&rig, Params {
            use_cross_coupling: true,
            position_gains: PidGains { kp: 0.05, kcc: 0.01, min: -1.0, max: 1.0, ..Default::default() },
            ..Default::default()
        }, true);
        c.read_sensors();
        let out = c.update(&driver).unwrap();
        assert!((out.left_power - 0.5).abs() < 1e-9);
        assert!((out.right_power - 0.05 * 10.2).abs() < 1e-9);
    }
}
