//! # Robot library.
//!
//! This library holds the robot's control core so that the executable, the benchmarks and any
//! other crate in the workspace can build and drive it.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Tuning parameters for the whole robot
pub mod params;

/// Generic PID computation shared by every closed loop controller
pub mod pid;

/// Operations, their bindings, and the driver which arbitrates between operator input and tasks
pub mod driver;

/// Control tasks - composable autonomous behaviours and macros
pub mod ctrl_task;

/// Drive train control - turns drive operations into left/right power
pub mod drive_ctrl;

/// Single motor mechanism
pub mod one_motor_ctrl;

/// Vision manager - reports the latest vision measurement
pub mod vision_mgr;

/// Power manager - reports the filtered battery voltage
pub mod power_mgr;

/// Mechanism manager - runs every mechanism and isolates their faults
pub mod mech_mgr;

/// The robot core as seen by the periodic harness
pub mod robot;

/// Simulated equipment
pub mod sim;

#[cfg(test)]
pub(crate) mod testing;
