//! Velocity mode calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;

// Internal
use super::{
    state::{PowerSetting, POWER_LEVEL_MAX, POWER_LEVEL_MIN, TELEM_CATEGORY},
    DriveCtrl
};
use crate::driver::{AnalogOperation, DigitalOperation, Driver};
use util::maths::{adjust_for_dead_zone, enforce_range};

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCtrl {

    /// Calculate the power from the forward and turn operations.
    ///
    /// Velocity goals are a fraction of the maximum velocity.
    pub(crate) fn calc_velocity_mode(&mut self, driver: &Driver) -> PowerSetting {
        let mut turn = driver.get_analog(AnalogOperation::DriveTrainTurn);
        let mut forward = driver.get_analog(AnalogOperation::DriveTrainMoveForward);

        // Treat the back of the robot as the front
        if driver.get_digital(DigitalOperation::DriveTrainSwapFrontOrientation) {
            turn = -turn;
            forward = -forward;
        }

        let turn = adjust_for_dead_zone(turn, self.params.x_dead_zone);
        let forward = adjust_for_dead_zone(forward, self.params.y_dead_zone);

        let (left_goal, right_goal) = mix(
            forward,
            turn,
            driver.get_digital(DigitalOperation::DriveTrainSimpleMode),
            self.params.k1,
            self.params.k2
        );

        let left_goal = left_goal * self.params.max_power_level;
        let right_goal = right_goal * self.params.max_power_level;

        self.telem.log_number(TELEM_CATEGORY, "left_velocity_goal", left_goal);
        self.telem.log_number(TELEM_CATEGORY, "right_velocity_goal", right_goal);

        let (left, right) = match (self.left_pid.as_mut(), self.right_pid.as_mut()) {
            (Some(l), Some(r)) => (
                l.calculate_velocity(left_goal, self.sensors.left_ticks),
                r.calculate_velocity(right_goal, self.sensors.right_ticks)
            ),
            _ => (left_goal, right_goal)
        };

        trace!("Velocity mode: goals ({:.3}, {:.3}), power ({:.3}, {:.3})",
            left_goal, right_goal, left, right);

        PowerSetting {
            left: enforce_range(left, POWER_LEVEL_MIN, POWER_LEVEL_MAX),
            right: enforce_range(right, POWER_LEVEL_MIN, POWER_LEVEL_MAX),
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Mix forward and turn into left and right velocity goals.
///
/// In simple mode the larger of the two wins outright: an in-place turn if
/// turn is larger, otherwise straight forward on both sides.
fn mix(forward: f64, turn: f64, simple: bool, k1: f64, k2: f64) -> (f64, f64) {
    if simple {
        if forward.abs() < turn.abs() {
            (turn, -turn)
        }
        else {
            (forward, forward)
        }
    }
    else {
        (k1 * forward + k2 * turn, k1 * forward - k2 * turn)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::drive_ctrl::Params;
    use crate::testing::{scripted_driver, RecordingTelem, TestRig};
    use std::rc::Rc;

    #[test]
    fn test_mix() {
        let (l, r) = mix(0.6, 0.0, false, 1.4, 0.5);
        assert!((l - 0.84).abs() < 1e-12);
        assert!((r - 0.84).abs() < 1e-12);

        assert_eq!(mix(0.2, 0.5, true, 1.4, 0.5), (0.5, -0.5));
        assert_eq!(mix(0.5, 0.5, true, 1.4, 0.5), (0.5, 0.5));
    }

    #[test]
    fn test_forward_goals() {
        let rig = TestRig::new();
        let telem = Rc::new(RecordingTelem::default());
        let params = Params {
            x_dead_zone: 0.0,
            y_dead_zone: 0.0,
            ..Default::default()
        };
        let mut c = DriveCtrl::new(params, true, rig.drive.clone(), rig.timer.clone(), telem.clone());
        let driver = scripted_driver(&rig, &[(AnalogOperation::DriveTrainMoveForward, 0.6)], &[]);

        c.read_sensors();
        c.update(&driver).unwrap();

        let goal = telem.last("left_velocity_goal").unwrap();
        assert!((goal - 0.84).abs() < 1e-12);
        assert_eq!(telem.last("left_velocity_goal"), telem.last("right_velocity_goal"));

        // First PID call measures no velocity, kp*0.84 + kf*0.84
        let out = c.output().unwrap();
        assert!((out.left_power - 0.5 * 0.84).abs() < 1e-12);
    }

    #[test]
    fn test_swap_and_dead_zone() {
        let rig = TestRig::new();
        let params = Params {
            use_pid_default: false,
            k1: 1.0,
            ..Default::default()
        };
        let mut c = DriveCtrl::new(
            params, true, rig.drive.clone(), rig.timer.clone(), Rc::new(RecordingTelem::default())
        );

        // Inside the 0.1 forward dead zone
        let driver = scripted_driver(&rig, &[(AnalogOperation::DriveTrainMoveForward, 0.08)], &[]);
        assert_eq!(c.update(&driver).unwrap().left_power, 0.0);

        // Swapped front, full forward becomes full reverse
        let driver = scripted_driver(
            &rig,
            &[(AnalogOperation::DriveTrainMoveForward, 1.0)],
            &[(DigitalOperation::DriveTrainSwapFrontOrientation, true)]
        );
        let out = c.update(&driver).unwrap();
        assert!((out.left_power + 1.0).abs() < 1e-12);
        assert!((out.right_power + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_velocity_mode_clamps() {
        let rig = TestRig::new();
        let params = Params {
            use_pid_default: false,
            x_dead_zone: 0.0,
            y_dead_zone: 0.0,
            ..Default::default()
        };
        let mut c = DriveCtrl::new(
            params, true, rig.drive.clone(), rig.timer.clone(), Rc::new(RecordingTelem::default())
        );

        // 1.4 + 0.5 is well over full power but velocity mode never errors
        let driver = scripted_driver(&rig, &[
            (AnalogOperation::DriveTrainMoveForward, 1.0),
            (AnalogOperation::DriveTrainTurn, 1.0),
        ], &[]);
        let out = c.update(&driver).unwrap();
        assert_eq!(out.left_power, 1.0);
        assert!((out.right_power - 0.9).abs() < 1e-12);
    }
}
