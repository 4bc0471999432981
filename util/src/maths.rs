//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value into the range `[min, max]`.
///
/// Returns the clamped value and a flag which is `true` if the value was
/// limited.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> (T, bool)
where
    T: Float,
{
    if *value > *max {
        (*max, true)
    } else if *value < *min {
        (*min, true)
    } else {
        (*value, false)
    }
}

/// Clamp a value into the symmetric range `[-bound, bound]`.
pub fn clamp_sym<T>(value: &T, bound: &T) -> (T, bool)
where
    T: Float,
{
    clamp(value, &-*bound, bound)
}
