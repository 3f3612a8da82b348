//! # Operations
//!
//! Named logical control signals. Mechanisms only ever read operations, they never look at the
//! joysticks directly.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An operation with a real value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnalogOperation {
    /// Forward velocity as a fraction of maximum, positive forward
    DriveTrainMoveForward,

    /// Turn velocity as a fraction of maximum, positive right
    DriveTrainTurn,

    /// Absolute left position goal in inches
    DriveTrainLeftPosition,

    /// Absolute right position goal in inches
    DriveTrainRightPosition,

    /// Left velocity goal in inches/second, used in path mode
    DriveTrainLeftVelocity,

    /// Right velocity goal in inches/second, used in path mode
    DriveTrainRightVelocity,

    OneMotorPower,
}

/// An operation with a boolean value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DigitalOperation {
    EnableVision,
    DriveTrainEnablePid,
    DriveTrainDisablePid,
    DriveTrainSimpleMode,
    DriveTrainUseBrakeMode,
    DriveTrainUsePositionalMode,
    DriveTrainUsePathMode,
    DriveTrainSwapFrontOrientation,
}

/// Either kind of operation, used where ownership is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    Analog(AnalogOperation),
    Digital(DigitalOperation),
}

/// A composite behaviour triggered by a button and run as a control task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MacroOperation {
    PidBrake,
    VisionCenter,
    VisionCenterAndAdvance,
    TurnInPlaceLeft,
    TurnInPlaceRight,
    DriveForwardShort,
    FollowStraightPath,
}

/// A modifier which selects an alternative control layer while held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Shift {
    Debug,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AnalogOperation {
    pub const ALL: [AnalogOperation; 7] = [
        AnalogOperation::DriveTrainMoveForward,
        AnalogOperation::DriveTrainTurn,
        AnalogOperation::DriveTrainLeftPosition,
        AnalogOperation::DriveTrainRightPosition,
        AnalogOperation::DriveTrainLeftVelocity,
        AnalogOperation::DriveTrainRightVelocity,
        AnalogOperation::OneMotorPower,
    ];
}

impl DigitalOperation {
    pub const ALL: [DigitalOperation; 8] = [
        DigitalOperation::EnableVision,
        DigitalOperation::DriveTrainEnablePid,
        DigitalOperation::DriveTrainDisablePid,
        DigitalOperation::DriveTrainSimpleMode,
        DigitalOperation::DriveTrainUseBrakeMode,
        DigitalOperation::DriveTrainUsePositionalMode,
        DigitalOperation::DriveTrainUsePathMode,
        DigitalOperation::DriveTrainSwapFrontOrientation,
    ];
}

impl Operation {
    /// Every operation, analog first.
    pub fn all() -> impl Iterator<Item = Operation> {
        AnalogOperation::ALL.iter().copied().map(Operation::Analog)
            .chain(DigitalOperation::ALL.iter().copied().map(Operation::Digital))
    }
}

impl MacroOperation {
    pub const ALL: [MacroOperation; 7] = [
        MacroOperation::PidBrake,
        MacroOperation::VisionCenter,
        MacroOperation::VisionCenterAndAdvance,
        MacroOperation::TurnInPlaceLeft,
        MacroOperation::TurnInPlaceRight,
        MacroOperation::DriveForwardShort,
        MacroOperation::FollowStraightPath,
    ];
}

impl From<AnalogOperation> for Operation {
    fn from(op: AnalogOperation) -> Self {
        Operation::Analog(op)
    }
}

impl From<DigitalOperation> for Operation {
    fn from(op: DigitalOperation) -> Self {
        Operation::Digital(op)
    }
}
