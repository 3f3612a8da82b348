//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Collapse values inside `[-dead_zone, dead_zone]` to zero and rescale the
/// remainder so the edge of the dead zone maps to zero and a full deflection
/// still maps to one.
///
/// `dead_zone` must be in `[0, 1)`.
pub fn adjust_for_dead_zone<T>(value: T, dead_zone: T) -> T
where
    T: Float
{
    if value < dead_zone && value > -dead_zone {
        return T::zero();
    }

    (value - value.signum() * dead_zone) / (T::one() - dead_zone)
}

/// Clamp a value into the range `[min, max]`.
///
/// NaN is mapped to zero so a bad sensor read can never produce a NaN demand.
pub fn enforce_range<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    if value.is_nan() {
        return T::zero();
    }

    value.max(min).min(max)
}
