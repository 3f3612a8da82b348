//! # Robot button map
//!
//! The bindings used on the competition robot. Driving is on the driver's stick, the single motor
//! mechanism is on the co-driver's stick, and holding the co-driver's trigger selects the debug
//! layer.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use eqpt_if::input::{
    AnalogAxis, UserInputDevice, UserInputDeviceButton, JOYSTICK_STICK_BOTTOM_LEFT_BUTTON,
    JOYSTICK_STICK_BOTTOM_RIGHT_BUTTON, JOYSTICK_STICK_THUMB_BUTTON,
    JOYSTICK_STICK_TOP_LEFT_BUTTON, JOYSTICK_STICK_TOP_RIGHT_BUTTON,
    JOYSTICK_STICK_TRIGGER_BUTTON
};

use super::{
    AnalogOperation, AnalogOperationDescription, AnalogRange, ButtonMap, ButtonType,
    DigitalOperation, DigitalOperationDescription, MacroOperation, MacroOperationDescription,
    Shift, ShiftDescription
};
use crate::ctrl_task::{
    drive::{DriveDistanceTask, MoveDistanceOneShotTask, PidBrakeTask},
    path::{FollowPathTask, PathProfile},
    vision_centering::VisionCenteringTask
};
use crate::params::TuningParams;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const SIMPLE_MODE_BUTTON: UserInputDeviceButton = UserInputDeviceButton::Button(7);
const ENABLE_PID_BUTTON: UserInputDeviceButton = UserInputDeviceButton::Button(11);
const DISABLE_PID_BUTTON: UserInputDeviceButton = UserInputDeviceButton::Button(12);
const POV_FORWARD: UserInputDeviceButton = UserInputDeviceButton::Pov(0);

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build the robot's button map from the tuning parameters.
pub fn robot_button_map(params: &TuningParams) -> ButtonMap {
    let driver = UserInputDevice::Driver;
    let co_driver = UserInputDevice::CoDriver;

    let map = ButtonMap::new()
        .with_shift(Shift::Debug, ShiftDescription::new(co_driver, JOYSTICK_STICK_TRIGGER_BUTTON))

        // ---- ANALOG ----

        // Stick forward is negative Y. Dead zones are applied by the drive train controller.
        .with_analog(
            AnalogOperation::DriveTrainMoveForward,
            AnalogOperationDescription::new(driver, AnalogAxis::Y, true, 0.0)
        )
        .with_analog(
            AnalogOperation::DriveTrainTurn,
            AnalogOperationDescription::new(driver, AnalogAxis::X, false, 0.0)
        )
        .with_analog(
            AnalogOperation::DriveTrainLeftPosition,
            AnalogOperationDescription::programmatic(AnalogRange::Unbounded)
        )
        .with_analog(
            AnalogOperation::DriveTrainRightPosition,
            AnalogOperationDescription::programmatic(AnalogRange::Unbounded)
        )
        .with_analog(
            AnalogOperation::DriveTrainLeftVelocity,
            AnalogOperationDescription::programmatic(AnalogRange::Unbounded)
        )
        .with_analog(
            AnalogOperation::DriveTrainRightVelocity,
            AnalogOperationDescription::programmatic(AnalogRange::Unbounded)
        )
        .with_analog(
            AnalogOperation::OneMotorPower,
            AnalogOperationDescription::new(co_driver, AnalogAxis::Y, true, 0.05)
        )

        // ---- DIGITAL ----

        .with_digital(DigitalOperation::EnableVision, DigitalOperationDescription::programmatic())
        .with_digital(
            DigitalOperation::DriveTrainSimpleMode,
            DigitalOperationDescription::new(driver, SIMPLE_MODE_BUTTON, ButtonType::Toggle)
        )
        .with_digital(
            DigitalOperation::DriveTrainSwapFrontOrientation,
            DigitalOperationDescription::new(driver, JOYSTICK_STICK_THUMB_BUTTON, ButtonType::Toggle)
        )
        .with_digital(
            DigitalOperation::DriveTrainEnablePid,
            DigitalOperationDescription::programmatic()
        )
        .with_digital(
            DigitalOperation::DriveTrainEnablePid,
            DigitalOperationDescription::new(driver, ENABLE_PID_BUTTON, ButtonType::Click)
                .shifted(Shift::Debug)
        )
        .with_digital(
            DigitalOperation::DriveTrainDisablePid,
            DigitalOperationDescription::programmatic()
        )
        .with_digital(
            DigitalOperation::DriveTrainDisablePid,
            DigitalOperationDescription::new(driver, DISABLE_PID_BUTTON, ButtonType::Click)
                .shifted(Shift::Debug)
        )
        .with_digital(
            DigitalOperation::DriveTrainUseBrakeMode,
            DigitalOperationDescription::programmatic()
        )
        .with_digital(
            DigitalOperation::DriveTrainUsePositionalMode,
            DigitalOperationDescription::programmatic()
        )
        .with_digital(
            DigitalOperation::DriveTrainUsePathMode,
            DigitalOperationDescription::programmatic()
        );

    with_macros(map, params)
}

fn with_macros(map: ButtonMap, params: &TuningParams) -> ButtonMap {
    let driver = UserInputDevice::Driver;
    let vision = params.tasks.vision.clone();
    let macros = params.tasks.macros.clone();
    let path = params.tasks.path.clone();

    let stationary_vision = vision.clone();
    let turn_left = macros.clone();
    let turn_right = macros.clone();
    let drive_short = macros.clone();

    map
        .with_macro(MacroOperation::PidBrake, MacroOperationDescription::new(
            driver,
            JOYSTICK_STICK_TRIGGER_BUTTON,
            ButtonType::Simple,
            PidBrakeTask::owned_operations(),
            || Box::new(PidBrakeTask::new())
        ))
        .with_macro(MacroOperation::VisionCenter, MacroOperationDescription::new(
            driver,
            JOYSTICK_STICK_BOTTOM_LEFT_BUTTON,
            ButtonType::Toggle,
            VisionCenteringTask::owned_operations(),
            move || Box::new(VisionCenteringTask::stationary(&stationary_vision, true))
        ))
        .with_macro(MacroOperation::VisionCenterAndAdvance, MacroOperationDescription::new(
            driver,
            JOYSTICK_STICK_BOTTOM_RIGHT_BUTTON,
            ButtonType::Toggle,
            VisionCenteringTask::owned_operations(),
            move || Box::new(VisionCenteringTask::advancing(&vision))
        ))
        .with_macro(MacroOperation::TurnInPlaceLeft, MacroOperationDescription::new(
            driver,
            JOYSTICK_STICK_TOP_LEFT_BUTTON,
            ButtonType::Click,
            MoveDistanceOneShotTask::owned_operations(),
            move || Box::new(MoveDistanceOneShotTask::new(
                -turn_left.turn_in_place_distance_in,
                turn_left.turn_in_place_distance_in,
                Some(turn_left.turn_in_place_timeout_s)
            ))
        ))
        .with_macro(MacroOperation::TurnInPlaceRight, MacroOperationDescription::new(
            driver,
            JOYSTICK_STICK_TOP_RIGHT_BUTTON,
            ButtonType::Click,
            MoveDistanceOneShotTask::owned_operations(),
            move || Box::new(MoveDistanceOneShotTask::new(
                turn_right.turn_in_place_distance_in,
                -turn_right.turn_in_place_distance_in,
                Some(turn_right.turn_in_place_timeout_s)
            ))
        ))
        .with_macro(MacroOperation::DriveForwardShort, MacroOperationDescription::new(
            driver,
            POV_FORWARD,
            ButtonType::Click,
            DriveDistanceTask::owned_operations(),
            move || Box::new(DriveDistanceTask::new(
                drive_short.drive_short_speed,
                drive_short.drive_short_distance_in,
                Some(drive_short.drive_short_timeout_s)
            ))
        ))
        .with_macro(MacroOperation::FollowStraightPath, MacroOperationDescription::new(
            driver,
            POV_FORWARD,
            ButtonType::Click,
            FollowPathTask::owned_operations(),
            move || Box::new(FollowPathTask::new(
                PathProfile::straight(macros.straight_path_distance_in, &path)
            ))
        ).shifted(Shift::Debug))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::{Driver, Operation};
    use crate::testing::TestRig;
    use eqpt_if::input::InputFrame;

    #[test]
    fn test_robot_map_is_valid() {
        let map = robot_button_map(&TuningParams::default());

        assert_eq!(map.validate(), Ok(()));
        assert_eq!(map.macros().len(), MacroOperation::ALL.len());
    }

    #[test]
    fn test_debug_layer_replaces_drive_forward() {
        let rig = TestRig::new();
        let mut driver = Driver::new(robot_button_map(&TuningParams::default()), rig.collab())
            .unwrap();
        let mut frame = InputFrame::default();

        // Debug held, the POV starts the path rather than the short drive
        frame.co_driver.press(1);
        frame.driver.pov = Some(0);
        driver.update(&frame);

        assert!(driver.is_macro_active(MacroOperation::FollowStraightPath));
        assert!(!driver.is_macro_active(MacroOperation::DriveForwardShort));
        assert!(driver.is_owned(Operation::Digital(DigitalOperation::DriveTrainUsePathMode)));
        assert!(driver.get_digital(DigitalOperation::DriveTrainUsePathMode));
    }

    #[test]
    fn test_stick_forward_is_positive() {
        let rig = TestRig::new();
        let mut driver = Driver::new(robot_button_map(&TuningParams::default()), rig.collab())
            .unwrap();
        let mut frame = InputFrame::default();

        frame.driver.set_axis(AnalogAxis::Y, -0.5);
        driver.update(&frame);

        assert!((driver.get_analog(AnalogOperation::DriveTrainMoveForward) - 0.5).abs() < 1e-12);
    }
}
