//! # Equipment Interface
//!
//! This module defines the traits implemented by equipment wrappers. The core never sees channel
//! numbers or CAN ids, only these interfaces.
//!
//! Equipment handles take `&self` for every call, including actuation: like a CAN device handle
//! they may be cloned and shared between the controller that drives them and the tasks that read
//! their sensors.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod drive;
pub mod motor;
pub mod power;
pub mod timer;
pub mod vision;

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

/// Errors reported by equipment.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EqptError {
    #[error("Equipment {0} is not connected")]
    NotConnected(&'static str),

    #[error("Equipment {device} reported a fault: {reason}")]
    Fault {
        device: &'static str,
        reason: String
    },

    #[error("Demand {0} is outside the range accepted by the equipment")]
    InvalidDemand(f64),
}
