//! # Mechanism manager
//!
//! Runs every mechanism on the robot each cycle and isolates their faults. On a development robot
//! the first fault is returned so it can't be missed, on the competition robot faults are logged
//! and the remaining mechanisms still run.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::rc::Rc;
use log::{error, trace};

use crate::{
    drive_ctrl::{DriveCtrl, DriveCtrlError},
    driver::Driver,
    one_motor_ctrl::OneMotorCtrl,
    power_mgr::PowerMgr,
    vision_mgr::VisionMgr
};
use eqpt_if::eqpt::EqptError;
use util::telem::TelemSink;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const TELEM_CATEGORY: &str = "mm";

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A part of the robot run once per cycle.
pub trait Mechanism {
    fn name(&self) -> &'static str;

    /// Read this cycle's sensor values.
    fn read_sensors(&mut self) -> Result<(), MechError>;

    /// Act on the current operations.
    fn update(&mut self, driver: &Driver) -> Result<(), MechError>;

    /// Stop all actuators.
    fn stop(&mut self) -> Result<(), MechError>;

    /// Called whenever a new driver takes over.
    fn set_driver(&mut self) {}
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MechError {
    #[error(transparent)]
    DriveCtrl(#[from] DriveCtrlError),

    #[error(transparent)]
    Eqpt(#[from] EqptError),

    #[error("{0}")]
    Fault(String),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct MechanismManager {
    mechanisms: Vec<Box<dyn Mechanism>>,
    throw_exceptions: bool,
    telem: Rc<dyn TelemSink>,

    /// Faults logged in competition mode during the last call
    faults: Vec<(&'static str, MechError)>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MechanismManager {
    pub fn new(
        mechanisms: Vec<Box<dyn Mechanism>>,
        throw_exceptions: bool,
        telem: Rc<dyn TelemSink>
    ) -> Self {
        Self {
            mechanisms,
            throw_exceptions,
            telem,
            faults: Vec::new(),
        }
    }

    /// Faults which were logged rather than returned during the last call.
    pub fn faults(&self) -> &[(&'static str, MechError)] {
        &self.faults
    }

    pub fn read_sensors(&mut self) -> Result<(), MechError> {
        self.for_each(|m| m.read_sensors())
    }

    pub fn update(&mut self, driver: &Driver) -> Result<(), MechError> {
        self.for_each(|m| m.update(driver))
    }

    pub fn stop(&mut self) -> Result<(), MechError> {
        self.for_each(|m| m.stop())
    }

    pub fn set_driver(&mut self) {
        for m in self.mechanisms.iter_mut() {
            m.set_driver();
        }
    }

    fn for_each<F>(&mut self, mut f: F) -> Result<(), MechError>
    where
        F: FnMut(&mut Box<dyn Mechanism>) -> Result<(), MechError>
    {
        self.faults.clear();

        for m in self.mechanisms.iter_mut() {
            if let Err(e) = f(m) {
                if self.throw_exceptions {
                    return Err(e)
                }

                error!("{} fault: {}", m.name(), e);
                self.telem.log_string(TELEM_CATEGORY, m.name(), &e.to_string());
                self.faults.push((m.name(), e));
            }
        }

        trace!("Ran {} mechanisms", self.mechanisms.len());

        Ok(())
    }
}

impl Mechanism for DriveCtrl {
    fn name(&self) -> &'static str {
        "drive_train"
    }

    fn read_sensors(&mut self) -> Result<(), MechError> {
        DriveCtrl::read_sensors(self);
        Ok(())
    }

    fn update(&mut self, driver: &Driver) -> Result<(), MechError> {
        DriveCtrl::update(self, driver)?;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), MechError> {
        Ok(DriveCtrl::stop(self)?)
    }

    fn set_driver(&mut self) {
        DriveCtrl::set_driver(self)
    }
}

impl Mechanism for OneMotorCtrl {
    fn name(&self) -> &'static str {
        "one_motor"
    }

    fn read_sensors(&mut self) -> Result<(), MechError> {
        Ok(())
    }

    fn update(&mut self, driver: &Driver) -> Result<(), MechError> {
        Ok(OneMotorCtrl::update(self, driver)?)
    }

    fn stop(&mut self) -> Result<(), MechError> {
        Ok(OneMotorCtrl::stop(self)?)
    }
}

impl Mechanism for PowerMgr {
    fn name(&self) -> &'static str {
        "power"
    }

    fn read_sensors(&mut self) -> Result<(), MechError> {
        PowerMgr::read_sensors(self);
        Ok(())
    }

    fn update(&mut self, _driver: &Driver) -> Result<(), MechError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), MechError> {
        Ok(())
    }
}

impl Mechanism for VisionMgr {
    fn name(&self) -> &'static str {
        "vision"
    }

    fn read_sensors(&mut self) -> Result<(), MechError> {
        VisionMgr::read_sensors(self);
        Ok(())
    }

    fn update(&mut self, driver: &Driver) -> Result<(), MechError> {
        VisionMgr::update(self, driver);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), MechError> {
        VisionMgr::stop(self);
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
