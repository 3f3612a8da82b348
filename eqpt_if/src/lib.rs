//! # Equipment interface crate.
//!
//! Provides the interfaces through which the control core sees the outside
//! world: actuators and sensors, the match timer, the vision measurement
//! published by the image processing thread, and the raw operator input.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Equipment traits and data (drive train, motors, timers, vision)
pub mod eqpt;

/// Raw operator input from the joysticks
pub mod input;
