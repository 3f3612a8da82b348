//! Implementations for the DriveCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::rc::Rc;
use log::{debug, info, trace};
use serde::Serialize;

// Internal
use super::{DriveCtrlError, DriveMode, Params};
use crate::driver::{DigitalOperation, Driver};
use crate::pid::{PidGains, PidHandler};
use eqpt_if::eqpt::{drive::DriveTrainEqpt, timer::Timer};
use util::{maths::enforce_range, telem::TelemSink};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Telemetry category for the drive train controller.
pub(crate) const TELEM_CATEGORY: &str = "dtc";

pub(crate) const POWER_LEVEL_MIN: f64 = -1.0;
pub(crate) const POWER_LEVEL_MAX: f64 = 1.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive train control state
pub struct DriveCtrl {
    pub(crate) params: Params,

    /// Range violations are errors rather than warnings
    pub(crate) throw_exceptions: bool,

    pub(crate) drive_train: Rc<dyn DriveTrainEqpt>,
    timer: Rc<dyn Timer>,
    pub(crate) telem: Rc<dyn TelemSink>,

    pub(crate) use_pid: bool,
    pub(crate) mode: DriveMode,

    pub(crate) left_pid: Option<PidHandler>,
    pub(crate) right_pid: Option<PidHandler>,

    /// Positions held in brake mode, captured on entry
    pub(crate) brake_hold_in: (f64, f64),

    pub(crate) sensors: SensorData,

    pub(crate) output: Option<OutputData>,
}

/// Encoder readings taken at the start of the cycle.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SensorData {
    /// Units: inches
    pub left_distance_in: f64,

    /// Units: inches
    pub right_distance_in: f64,

    pub left_ticks: f64,
    pub right_ticks: f64,

    /// Units: inches/second
    pub left_velocity_ips: f64,

    /// Units: inches/second
    pub right_velocity_ips: f64,
}

/// Power demanded from the drive train.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OutputData {
    pub left_power: f64,
    pub right_power: f64,
    pub mode: DriveMode,
}

/// Left and right power before the output stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct PowerSetting {
    pub left: f64,
    pub right: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCtrl {
    /// Create the controller, starting in velocity mode.
    pub fn new(
        params: Params,
        throw_exceptions: bool,
        drive_train: Rc<dyn DriveTrainEqpt>,
        timer: Rc<dyn Timer>,
        telem: Rc<dyn TelemSink>
    ) -> Self {
        let use_pid = params.use_pid_default;

        let mut ctrl = Self {
            params,
            throw_exceptions,
            drive_train,
            timer,
            telem,
            use_pid,
            mode: DriveMode::Velocity,
            left_pid: None,
            right_pid: None,
            brake_hold_in: (0.0, 0.0),
            sensors: SensorData::default(),
            output: None,
        };
        ctrl.build_pid_handlers();

        ctrl
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn use_pid(&self) -> bool {
        self.use_pid
    }

    /// The output of the last successful cycle.
    pub fn output(&self) -> Option<OutputData> {
        self.output
    }

    /// Read the encoders for this cycle.
    pub fn read_sensors(&mut self) {
        let d = &self.drive_train;
        self.sensors = SensorData {
            left_distance_in: d.left_encoder_distance(),
            right_distance_in: d.right_encoder_distance(),
            left_ticks: d.left_encoder_ticks(),
            right_ticks: d.right_encoder_ticks(),
            left_velocity_ips: d.left_encoder_velocity(),
            right_velocity_ips: d.right_encoder_velocity(),
        };

        self.telem.log_number(TELEM_CATEGORY, "left_distance", self.sensors.left_distance_in);
        self.telem.log_number(TELEM_CATEGORY, "right_distance", self.sensors.right_distance_in);
        self.telem.log_number(TELEM_CATEGORY, "left_velocity", self.sensors.left_velocity_ips);
        self.telem.log_number(TELEM_CATEGORY, "right_velocity", self.sensors.right_velocity_ips);
    }

    /// Perform cyclic processing of drive train control.
    pub fn update(&mut self, driver: &Driver) -> Result<OutputData, DriveCtrlError> {
        if driver.get_digital(DigitalOperation::DriveTrainEnablePid) {
            info!("Drive train PID enabled");
            self.use_pid = true;
            self.build_pid_handlers();
        }
        else if driver.get_digital(DigitalOperation::DriveTrainDisablePid) {
            info!("Drive train PID disabled");
            self.use_pid = false;
            self.build_pid_handlers();
        }

        let mode = select_mode(driver);
        if mode != self.mode {
            debug!("Drive train mode changed from {:?} to {:?}", self.mode, mode);

            if mode == DriveMode::Brake {
                self.brake_hold_in = (self.sensors.left_distance_in, self.sensors.right_distance_in);
            }

            self.mode = mode;
            self.build_pid_handlers();
        }

        let power = match self.mode {
            DriveMode::Velocity => self.calc_velocity_mode(driver),
            DriveMode::Position => self.calc_position_mode(driver)?,
            DriveMode::Brake => self.calc_brake_mode()?,
            DriveMode::Path => self.calc_path_mode(driver)?,
        };

        let output = self.apply_output_stage(power)?;
        self.output = Some(output);

        Ok(output)
    }

    /// Stop the drive train.
    pub fn stop(&mut self) -> Result<(), DriveCtrlError> {
        self.drive_train.set_drive_train_power(0.0, 0.0)?;
        self.output = None;
        Ok(())
    }

    /// Called when a new driver takes over, returns to closed loop velocity
    /// control.
    pub fn set_driver(&mut self) {
        if !self.use_pid || self.mode != DriveMode::Velocity {
            self.use_pid = true;
            self.mode = DriveMode::Velocity;
            self.build_pid_handlers();
        }
    }

    /// Replace both PID handlers with fresh ones for the current mode.
    pub(crate) fn build_pid_handlers(&mut self) {
        if !self.use_pid {
            self.left_pid = None;
            self.right_pid = None;
            return
        }

        let gains = self.mode_gains();
        self.left_pid = Some(PidHandler::new(gains, self.timer.clone()));
        self.right_pid = Some(PidHandler::new(gains, self.timer.clone()));

        trace!("Built {:?} PID handlers: {:?}", self.mode, gains);
    }

    fn mode_gains(&self) -> PidGains {
        match self.mode {
            DriveMode::Velocity => self.params.velocity_gains,
            DriveMode::Position => self.params.position_gains,
            DriveMode::Brake => self.params.brake_gains,
            DriveMode::Path => self.params.path_gains,
        }
    }

    /// Apply the reverse scale factors, clamp and send to the drive train.
    fn apply_output_stage(&mut self, power: PowerSetting) -> Result<OutputData, DriveCtrlError> {
        let mut left = power.left;
        let mut right = power.right;

        if left < 0.0 {
            left *= self.params.reverse_left_scale_factor;
        }
        if right < 0.0 {
            right *= self.params.reverse_right_scale_factor;
        }

        let left = enforce_range(left, POWER_LEVEL_MIN, POWER_LEVEL_MAX);
        let right = enforce_range(right, POWER_LEVEL_MIN, POWER_LEVEL_MAX);

        self.telem.log_number(TELEM_CATEGORY, "left_power", left);
        self.telem.log_number(TELEM_CATEGORY, "right_power", right);

        self.drive_train.set_drive_train_power(left, right)?;

        Ok(OutputData {
            left_power: left,
            right_power: right,
            mode: self.mode,
        })
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Mode requested by the driver.
fn select_mode(driver: &Driver) -> DriveMode {
    if driver.get_digital(DigitalOperation::DriveTrainUsePathMode) {
        DriveMode::Path
    }
    else if driver.get_digital(DigitalOperation::DriveTrainUseBrakeMode) {
        DriveMode::Brake
    }
    else if driver.get_digital(DigitalOperation::DriveTrainUsePositionalMode) {
        DriveMode::Position
    }
    else {
        DriveMode::Velocity
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::driver::AnalogOperation;
    use crate::testing::{set_ops, scripted_driver, RecordingTelem, TestRig};

    fn ctrl(rig: &TestRig, params: Params, throw: bool) -> (DriveCtrl, Rc<RecordingTelem>) {
        let telem = Rc::new(RecordingTelem::default());
        let c = DriveCtrl::new(params, throw, rig.drive.clone(), rig.timer.clone(), telem.clone());
        (c, telem)
    }

    fn no_dead_zone() -> Params {
        Params {
            x_dead_zone: 0.0,
            y_dead_zone: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_mode_priority() {
        let rig = TestRig::new();
        let (mut c, _) = ctrl(&rig, Params::default(), true);
        let mut driver = scripted_driver(&rig, &[], &[
            (DigitalOperation::DriveTrainUsePositionalMode, true),
            (DigitalOperation::DriveTrainUseBrakeMode, true),
        ]);

        c.update(&driver).unwrap();
        assert_eq!(c.mode(), DriveMode::Brake);

        set_ops(&mut driver, &[], &[
            (DigitalOperation::DriveTrainUsePositionalMode, true),
            (DigitalOperation::DriveTrainUseBrakeMode, true),
            (DigitalOperation::DriveTrainUsePathMode, true),
        ]);
        c.update(&driver).unwrap();
        assert_eq!(c.mode(), DriveMode::Path);

        set_ops(&mut driver, &[], &[]);
        c.update(&driver).unwrap();
        assert_eq!(c.mode(), DriveMode::Velocity);
    }

    #[test]
    fn test_set_driver_resets_to_velocity_pid() {
        let rig = TestRig::new();
        let (mut c, _) = ctrl(&rig, Params::default(), true);
        let driver = scripted_driver(&rig, &[], &[
            (DigitalOperation::DriveTrainUsePositionalMode, true),
            (DigitalOperation::DriveTrainDisablePid, true),
        ]);

        c.update(&driver).unwrap();
        assert_eq!(c.mode(), DriveMode::Position);
        assert!(!c.use_pid());

        c.set_driver();
        assert_eq!(c.mode(), DriveMode::Velocity);
        assert!(c.use_pid());
        assert!(c.left_pid.is_some());
    }

    #[test]
    fn test_reverse_scale_on_negative_only() {
        let rig = TestRig::new();
        let params = Params {
            use_pid_default: false,
            reverse_left_scale_factor: 0.9,
            reverse_right_scale_factor: 0.8,
            ..no_dead_zone()
        };
        let (mut c, _) = ctrl(&rig, params, true);

        // Turning right in place, left forward and right in reverse
        let driver = scripted_driver(&rig, &[(AnalogOperation::DriveTrainTurn, 1.0)], &[]);
        let out = c.update(&driver).unwrap();

        assert!((out.left_power - 0.5).abs() < 1e-12);
        assert!((out.right_power + 0.4).abs() < 1e-12);
        assert_eq!(rig.drive.powers(), (out.left_power, out.right_power));
    }

    #[test]
    fn test_equipment_fault_is_returned() {
        let rig = TestRig::new();
        let (mut c, _) = ctrl(&rig, Params::default(), false);
        let driver = scripted_driver(&rig, &[], &[]);

        rig.drive.inject_fault(Some("brownout"));
        assert!(matches!(c.update(&driver), Err(DriveCtrlError::Eqpt(_))));

        rig.drive.inject_fault(None);
        assert!(c.update(&driver).is_ok());
    }

    #[test]
    fn test_stop_zeroes_power() {
        let rig = TestRig::new();
        let (mut c, _) = ctrl(&rig, Params { use_pid_default: false, ..no_dead_zone() }, true);
        let driver = scripted_driver(&rig, &[(AnalogOperation::DriveTrainMoveForward, 0.5)], &[]);

        c.update(&driver).unwrap();
        assert!(rig.drive.powers().0 > 0.0);

        c.stop().unwrap();
        assert_eq!(rig.drive.powers(), (0.0, 0.0));
        assert_eq!(c.output(), None);
    }
}
