//! # Robot tuning parameters
//!
//! Every tunable value on the robot, loaded once at startup from `robot_exec.toml`. Missing
//! sections and fields take their default, tuned, values.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{ctrl_task, drive_ctrl, one_motor_ctrl, power_mgr, sim};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningParams {

    /// Set on the robot used at competitions. Faults are then logged and the remaining
    /// mechanisms keep running, otherwise faults are returned as errors.
    pub competition_robot: bool,

    pub drive_ctrl: drive_ctrl::Params,

    pub one_motor: one_motor_ctrl::Params,

    pub power: power_mgr::Params,

    pub tasks: ctrl_task::Params,

    /// Simulated drive train used by the executable
    pub sim_drive: sim::SimDriveParams,

    /// Simulated vision target used by the executable
    pub sim_vision: sim::SimVisionParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for TuningParams {
    fn default() -> Self {
        Self {
            competition_robot: false,
            drive_ctrl: drive_ctrl::Params::default(),
            one_motor: one_motor_ctrl::Params::default(),
            power: power_mgr::Params::default(),
            tasks: ctrl_task::Params::default(),
            sim_drive: sim::SimDriveParams::default(),
            sim_vision: sim::SimVisionParams::default(),
        }
    }
}

impl TuningParams {
    /// Whether faults and range violations are returned as errors.
    pub fn throw_exceptions(&self) -> bool {
        !self.competition_robot
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
