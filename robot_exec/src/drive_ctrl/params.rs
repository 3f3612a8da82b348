//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::DriveCtrlError;
use crate::pid::PidGains;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for drive train control.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- MODES ----

    /// Whether closed loop control is enabled at startup
    pub use_pid_default: bool,

    // ---- VELOCITY MODE ----

    /// Forward mixing coefficient
    pub k1: f64,

    /// Turn mixing coefficient
    pub k2: f64,

    /// Dead zone applied to the turn operation
    pub x_dead_zone: f64,

    /// Dead zone applied to the forward operation
    pub y_dead_zone: f64,

    /// Ceiling applied to the mixed velocity goals
    pub max_power_level: f64,

    /// Velocity PID gains, `ks` is the encoder rate at full velocity.
    pub velocity_gains: PidGains,

    // ---- POSITION MODE ----

    pub position_gains: PidGains,

    /// Couple the left and right position loops together
    pub use_cross_coupling: bool,

    /// Sync errors smaller than this are ignored.
    ///
    /// Units: inches
    pub cross_coupling_range_in: f64,

    /// Position errors smaller than this give no power when PID is disabled.
    ///
    /// Units: inches
    pub non_pid_threshold_in: f64,

    /// Power ceiling when PID is disabled in position mode
    pub non_pid_max_power: f64,

    // ---- BRAKE MODE ----

    pub brake_gains: PidGains,

    // ---- PATH MODE ----

    pub path_gains: PidGains,

    /// Velocity feedforward gain
    pub path_kv: f64,

    /// Velocity at which the feedforward gives `path_kv` power.
    ///
    /// Units: inches/second
    pub path_max_velocity_ips: f64,

    pub path_max_power: f64,

    // ---- OUTPUT ----

    /// Multiplies the left power when driving in reverse
    pub reverse_left_scale_factor: f64,

    /// Multiplies the right power when driving in reverse
    pub reverse_right_scale_factor: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            use_pid_default: true,

            k1: 1.4,
            k2: 0.5,
            x_dead_zone: 0.05,
            y_dead_zone: 0.1,
            max_power_level: 1.0,
            velocity_gains: PidGains {
                kp: 0.3,
                kf: 0.2,
                ks: 5000.0,
                ..Default::default()
            },

            position_gains: PidGains::pd(0.06, 0.0, 0.6),
            use_cross_coupling: false,
            cross_coupling_range_in: 0.5,
            non_pid_threshold_in: 0.1,
            non_pid_max_power: 0.2,

            brake_gains: PidGains::pd(0.1, 0.0, 0.6),

            path_gains: PidGains::pd(0.06, 0.0, 0.8),
            path_kv: 1.0,
            path_max_velocity_ips: 120.0,
            path_max_power: 0.8,

            reverse_left_scale_factor: 1.0,
            reverse_right_scale_factor: 1.0,
        }
    }
}

impl Params {
    /// Check the parameters can be used, the dead zones must be in `[0, 1)`.
    pub fn validate(&self) -> Result<(), DriveCtrlError> {
        let dead_zones = [("turn", self.x_dead_zone), ("forward", self.y_dead_zone)];

        for (name, dz) in dead_zones.iter() {
            if !(*dz >= 0.0 && *dz < 1.0) {
                return Err(DriveCtrlError::InvalidDeadZone(*name, *dz))
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
