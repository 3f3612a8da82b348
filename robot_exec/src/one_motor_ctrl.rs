//! # Single motor control
//!
//! Drives one motor from the `OneMotorPower` operation. If the motor's
//! controller is running closed loop the operation is scaled into a velocity
//! setpoint, otherwise it's used as the power directly.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::rc::Rc;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::driver::{AnalogOperation, Driver};
use eqpt_if::eqpt::{motor::MotorEqpt, EqptError};
use util::telem::TelemSink;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const TELEM_CATEGORY: &str = "om";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    /// Whether the motor controller is running its own velocity loop
    pub use_pid: bool,

    /// Setpoint corresponding to full power when `use_pid` is set.
    ///
    /// Units: controller velocity units
    pub pid_max_velocity: f64,
}

pub struct OneMotorCtrl {
    params: Params,
    motor: Rc<dyn MotorEqpt>,
    telem: Rc<dyn TelemSink>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            use_pid: false,
            pid_max_velocity: 3600.0,
        }
    }
}

impl OneMotorCtrl {
    pub fn new(params: Params, motor: Rc<dyn MotorEqpt>, telem: Rc<dyn TelemSink>) -> Self {
        Self { params, motor, telem }
    }

    pub fn update(&mut self, driver: &Driver) -> Result<(), EqptError> {
        let mut setpoint = driver.get_analog(AnalogOperation::OneMotorPower);
        if self.params.use_pid {
            setpoint *= self.params.pid_max_velocity;
        }

        self.telem.log_number(TELEM_CATEGORY, "power/setpoint", setpoint);
        self.motor.set_power(setpoint)?;

        let speed = self.motor.speed();
        let error = self.motor.error();

        let error_percent = if setpoint != 0.0 {
            100.0 * error / setpoint
        }
        else {
            0.0
        };

        self.telem.log_number(TELEM_CATEGORY, "speed", speed);
        self.telem.log_number(TELEM_CATEGORY, "error", error);
        self.telem.log_number(TELEM_CATEGORY, "error%", error_percent);

        trace!("One motor: setpoint {:.3}, speed {:.3}, error {:.3}", setpoint, speed, error);

        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), EqptError> {
        self.motor.set_power(0.0)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
