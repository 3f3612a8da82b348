//! # Single motor equipment

use super::EqptError;

/// A single motor with a smart controller which may be running closed loop.
pub trait MotorEqpt {
    /// Set the motor power, or the closed loop setpoint if the controller is in a PID mode.
    fn set_power(&self, power: f64) -> Result<(), EqptError>;

    /// Current speed reported by the controller.
    fn speed(&self) -> f64;

    /// Current closed loop error reported by the controller.
    fn error(&self) -> f64;
}
