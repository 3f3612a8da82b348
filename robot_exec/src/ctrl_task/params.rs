//! Control task parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::pid::PidGains;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for every control task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub vision: VisionParams,
    pub path: PathParams,
    pub macros: MacroParams,
    pub auto: AutoParams,
}

/// Vision centering parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionParams {
    /// Gains used to turn on the spot towards the target
    pub stationary_gains: PidGains,

    /// Gains used to turn towards the target while advancing
    pub moving_gains: PidGains,

    /// Gains used to advance towards the target
    pub advancing_gains: PidGains,

    /// Maximum difference between the measured and desired angle to count as
    /// centered.
    ///
    /// Units: degrees
    pub max_centering_range_deg: f64,

    /// Time the target must stay centered before the task completes.
    ///
    /// Units: seconds
    pub settle_time_s: f64,

    /// Number of consecutive cycles without a target before giving up
    pub no_center_threshold: u32,

    /// Distance to the target at which advancing stops.
    ///
    /// Units: inches
    pub max_acceptable_forward_distance_in: f64,
}

/// Path following parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathParams {
    /// Units: inches/second
    pub max_velocity_ips: f64,

    /// Units: inches/second^2
    pub max_acceleration_ipss: f64,
}

/// Parameters of the macros bound to buttons.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroParams {
    /// Distance each side travels (in opposite directions) for a turn in place.
    ///
    /// Units: inches
    pub turn_in_place_distance_in: f64,

    pub turn_in_place_timeout_s: f64,

    /// Fraction of maximum forward velocity
    pub drive_short_speed: f64,

    /// Units: inches
    pub drive_short_distance_in: f64,

    pub drive_short_timeout_s: f64,

    /// Units: inches
    pub straight_path_distance_in: f64,
}

/// Autonomous routine selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoParams {
    pub routine: AutoRoutine,

    /// Fraction of maximum forward velocity
    pub drive_speed: f64,

    /// Units: inches
    pub drive_distance_in: f64,

    pub drive_timeout_s: f64,

    /// Pause between driving and centering
    pub settle_pause_s: f64,

    /// Maximum time allowed for vision centering
    pub centering_timeout_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The available autonomous routines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutoRoutine {
    /// Sit still
    None,

    /// Drive forward a fixed distance
    DriveForward,

    /// Drive forward then center on the vision target
    DriveAndCenter,

    /// Follow a straight trapezoidal path
    FollowPath,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for VisionParams {
    fn default() -> Self {
        Self {
            stationary_gains: PidGains::pd(0.08, 0.08, 0.3),
            moving_gains: PidGains::pd(0.015, 0.0, 0.3),
            advancing_gains: PidGains::pd(0.005, 0.0, 0.3),
            max_centering_range_deg: 5.0,
            settle_time_s: 0.75,
            no_center_threshold: 20,
            max_acceptable_forward_distance_in: 30.0,
        }
    }
}

impl Default for PathParams {
    fn default() -> Self {
        Self {
            max_velocity_ips: 60.0,
            max_acceleration_ipss: 40.0,
        }
    }
}

impl Default for MacroParams {
    fn default() -> Self {
        Self {
            turn_in_place_distance_in: 10.0,
            turn_in_place_timeout_s: 2.0,
            drive_short_speed: 0.3,
            drive_short_distance_in: 12.0,
            drive_short_timeout_s: 2.0,
            straight_path_distance_in: 48.0,
        }
    }
}

impl Default for AutoParams {
    fn default() -> Self {
        Self {
            routine: AutoRoutine::DriveAndCenter,
            drive_speed: 0.5,
            drive_distance_in: 60.0,
            drive_timeout_s: 4.0,
            settle_pause_s: 0.5,
            centering_timeout_s: 3.0,
        }
    }
}
