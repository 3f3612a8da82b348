//! # Drive train equipment

use super::EqptError;

/// A two-sided (skid steer) drive train with an encoder on each side.
pub trait DriveTrainEqpt {
    /// Left encoder distance since the last reset.
    ///
    /// Units: inches
    fn left_encoder_distance(&self) -> f64;

    /// Right encoder distance since the last reset.
    ///
    /// Units: inches
    fn right_encoder_distance(&self) -> f64;

    /// Raw left encoder count.
    fn left_encoder_ticks(&self) -> f64;

    /// Raw right encoder count.
    fn right_encoder_ticks(&self) -> f64;

    /// Left encoder velocity.
    ///
    /// Units: inches/second
    fn left_encoder_velocity(&self) -> f64;

    /// Right encoder velocity.
    ///
    /// Units: inches/second
    fn right_encoder_velocity(&self) -> f64;

    /// Apply a normalised power level, in `[-1, 1]`, to each side.
    fn set_drive_train_power(&self, left: f64, right: f64) -> Result<(), EqptError>;
}
