//! # Drive train control module
//!
//! Turns the drive train operations into left and right power. The controller runs in one of four
//! modes, chosen from the digital operations every cycle:
//!
//! - `Velocity` - operator style arcade driving from the forward and turn operations,
//! - `Position` - drive each side to an absolute position goal,
//! - `Brake` - hold the positions captured when the mode was entered,
//! - `Path` - follow position goals with velocity feedforward.
//!
//! Path takes priority over brake, which takes priority over position. Whenever the mode or the
//! PID enable changes both side's PID handlers are rebuilt with the gains of the new mode, so no
//! integral or derivative state carries over.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calc_position;
mod calc_velocity;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use eqpt_if::eqpt::EqptError;

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The control mode of the drive train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriveMode {
    Velocity,
    Position,
    Brake,
    Path,
}

/// A side of the drive train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Side {
    Left,
    Right,
}

/// Possible errors that can occur during DriveCtrl operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("{side:?} power {value} in {mode:?} mode is outside [-1, 1]")]
    PowerOutOfRange {
        side: Side,
        value: f64,
        mode: DriveMode,
    },

    #[error("The {0} dead zone is {1}, it must be in [0, 1)")]
    InvalidDeadZone(&'static str, f64),

    #[error("Drive train equipment error: {0}")]
    Eqpt(#[from] EqptError),
}

impl Default for DriveMode {
    fn default() -> Self {
        DriveMode::Velocity
    }
}
