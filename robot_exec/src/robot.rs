//! # Robot core
//!
//! The control core as seen by the periodic harness. The harness calls one of the `*_init`
//! functions whenever the match phase changes and then `update` once per cycle.
//!
//! Each cycle runs, in order:
//!
//! 1. Every mechanism reads its sensors.
//! 2. The driver arbitrates the operator input and steps the active tasks.
//! 3. Every mechanism acts on the resulting operations.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::rc::Rc;
use log::info;

use crate::{
    ctrl_task::{self, auto::autonomous_routine},
    drive_ctrl::{DriveCtrl, DriveCtrlError},
    driver::{robot_button_map, Collaborators, ConfigError, Driver},
    mech_mgr::{MechError, Mechanism, MechanismManager},
    one_motor_ctrl::OneMotorCtrl,
    params::TuningParams,
    power_mgr::PowerMgr,
    vision_mgr::VisionMgr
};
use eqpt_if::{
    eqpt::{motor::MotorEqpt, power::PowerEqpt},
    input::InputFrame
};
use util::telem::TelemSink;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RobotError {
    #[error("Invalid button map: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid drive train parameters: {0}")]
    DriveCtrl(#[from] DriveCtrlError),

    #[error("Mechanism error: {0}")]
    Mech(#[from] MechError),
}

/// The phase of the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotMode {
    Disabled,
    Autonomous,
    Teleop,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct RobotCore {
    driver: Driver,
    mechanisms: MechanismManager,
    tasks: ctrl_task::Params,
    mode: RobotMode,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RobotCore {
    pub fn new(driver: Driver, mechanisms: MechanismManager, tasks: ctrl_task::Params) -> Self {
        Self {
            driver,
            mechanisms,
            tasks,
            mode: RobotMode::Disabled,
        }
    }

    pub fn mode(&self) -> RobotMode {
        self.mode
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn mechanisms(&self) -> &MechanismManager {
        &self.mechanisms
    }

    /// Stop everything and wait.
    pub fn disabled_init(&mut self) -> Result<(), RobotError> {
        info!("Disabled");
        self.mode = RobotMode::Disabled;
        self.stop()
    }

    /// Start the configured autonomous routine.
    pub fn autonomous_init(&mut self) -> Result<(), RobotError> {
        info!("Autonomous");
        self.mode = RobotMode::Autonomous;

        self.driver.stop();
        self.set_driver();
        self.driver.start_autonomous(autonomous_routine(&self.tasks));

        Ok(())
    }

    /// Hand control to the operators.
    pub fn teleop_init(&mut self) -> Result<(), RobotError> {
        info!("Teleop");
        self.mode = RobotMode::Teleop;

        self.driver.stop();
        self.set_driver();

        Ok(())
    }

    /// Run one control cycle.
    ///
    /// While disabled only the sensors are read.
    pub fn update(&mut self, frame: &InputFrame) -> Result<(), RobotError> {
        self.mechanisms.read_sensors()?;

        if self.mode == RobotMode::Disabled {
            return Ok(())
        }

        self.driver.update(frame);
        self.mechanisms.update(&self.driver)?;

        Ok(())
    }

    /// Cancel every task and stop every mechanism.
    pub fn stop(&mut self) -> Result<(), RobotError> {
        self.driver.stop();
        self.mechanisms.stop()?;

        Ok(())
    }

    pub fn set_driver(&mut self) {
        self.mechanisms.set_driver();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Wire up the robot from its parameters and equipment.
pub fn build_robot(
    params: &TuningParams,
    collab: Collaborators,
    motor: Rc<dyn MotorEqpt>,
    power: Rc<dyn PowerEqpt>,
    telem: Rc<dyn TelemSink>
) -> Result<RobotCore, RobotError> {
    let throw_exceptions = params.throw_exceptions();
    params.drive_ctrl.validate()?;

    let drive = DriveCtrl::new(
        params.drive_ctrl.clone(),
        throw_exceptions,
        collab.drive_train.clone(),
        collab.timer.clone(),
        telem.clone()
    );
    let one_motor = OneMotorCtrl::new(params.one_motor.clone(), motor, telem.clone());
    let vision = VisionMgr::new(collab.vision.clone(), telem.clone());
    let power = PowerMgr::new(params.power.clone(), power, telem.clone());

    let mechanisms: Vec<Box<dyn Mechanism>> = vec![
        Box::new(power),
        Box::new(vision),
        Box::new(drive),
        Box::new(one_motor),
    ];

    let driver = Driver::new(robot_button_map(params), collab)?;

    info!(
        "Robot built with {} mechanisms, {} mode",
        mechanisms.len(),
        if throw_exceptions { "development" } else { "competition" }
    );

    Ok(RobotCore::new(
        driver,
        MechanismManager::new(mechanisms, throw_exceptions, telem),
        params.tasks.clone()
    ))
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::ctrl_task::AutoRoutine;
    use crate::sim::{SimMotor, SimPower};
    use crate::testing::{RecordingTelem, TestRig};
    use eqpt_if::input::AnalogAxis;

    fn robot(rig: &TestRig, params: &TuningParams) -> RobotCore {
        build_robot(
            params,
            rig.collab(),
            Rc::new(SimMotor::new(3600.0)),
            Rc::new(SimPower::new(12.5)),
            Rc::new(RecordingTelem::default())
        ).unwrap()
    }

    #[test]
    fn test_rejects_full_dead_zone() {
        let rig = TestRig::new();
        let mut params = TuningParams::default();
        params.drive_ctrl.y_dead_zone = 1.0;

        let result = build_robot(
            &params,
            rig.collab(),
            Rc::new(SimMotor::new(3600.0)),
            Rc::new(SimPower::new(12.5)),
            Rc::new(RecordingTelem::default())
        );

        assert!(matches!(
            result,
            Err(RobotError::DriveCtrl(DriveCtrlError::InvalidDeadZone("forward", _)))
        ));
    }

    #[test]
    fn test_power_reported_while_disabled() {
        let rig = TestRig::new();
        let power = Rc::new(SimPower::new(12.5));
        let telem = Rc::new(RecordingTelem::default());
        let mut r = build_robot(
            &TuningParams::default(),
            rig.collab(),
            Rc::new(SimMotor::new(3600.0)),
            power.clone(),
            telem.clone()
        ).unwrap();

        r.disabled_init().unwrap();
        power.set_voltage(11.5);
        r.update(&InputFrame::default()).unwrap();

        assert_eq!(telem.last("raw_voltage"), Some(11.5));
        assert!((telem.last("voltage").unwrap() - 11.9).abs() < 1e-9);
    }

    #[test]
    fn test_teleop_drives_from_stick() {
        let rig = TestRig::new();
        let mut params = TuningParams::default();
        params.drive_ctrl.use_pid_default = false;
        let mut r = robot(&rig, &params);

        let mut frame = InputFrame::default();
        frame.driver.set_axis(AnalogAxis::Y, -0.5);

        // Nothing moves while disabled
        r.disabled_init().unwrap();
        r.update(&frame).unwrap();
        assert_eq!(rig.drive.powers(), (0.0, 0.0));

        r.teleop_init().unwrap();
        r.update(&frame).unwrap();
        let (l, r_power) = rig.drive.powers();
        assert!(l > 0.0);
        assert_eq!(l, r_power);
    }

    #[test]
    fn test_autonomous_runs_routine() {
        let rig = TestRig::new();
        let mut params = TuningParams::default();
        params.tasks.auto.routine = AutoRoutine::DriveForward;
        let mut r = robot(&rig, &params);

        r.autonomous_init().unwrap();
        assert!(r.driver().is_autonomous_active());

        // Operator input is ignored during autonomous
        let mut frame = InputFrame::default();
        frame.driver.set_axis(AnalogAxis::Y, 1.0);
        r.update(&frame).unwrap();

        let (l, _) = rig.drive.powers();
        assert!(l > 0.0);
        assert_eq!(r.mode(), RobotMode::Autonomous);

        // Switching to teleop ends the routine
        r.teleop_init().unwrap();
        assert!(!r.driver().is_autonomous_active());
    }

    #[test]
    fn test_development_fault_is_returned() {
        let rig = TestRig::new();
        let mut r = robot(&rig, &TuningParams::default());

        r.teleop_init().unwrap();
        rig.drive.inject_fault(Some("brownout"));

        assert!(matches!(r.update(&InputFrame::default()), Err(RobotError::Mech(_))));
    }

    #[test]
    fn test_competition_fault_is_logged() {
        let rig = TestRig::new();
        let params = TuningParams { competition_robot: true, ..Default::default() };
        let mut r = robot(&rig, &params);

        r.teleop_init().unwrap();
        rig.drive.inject_fault(Some("brownout"));

        assert!(r.update(&InputFrame::default()).is_ok());
        assert_eq!(r.mechanisms().faults().len(), 1);
        assert_eq!(r.mechanisms().faults()[0].0, "drive_train");
    }
}
