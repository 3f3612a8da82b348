//! # Power distribution equipment

/// The robot's power distribution board.
pub trait PowerEqpt {
    /// Battery voltage as measured at the board.
    ///
    /// Units: volts
    fn voltage(&self) -> f64;
}
