//! Command shaping module
//!
//! Converts discrete key presses into a bounded speed and steering angle command for the
//! vehicle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod bindings;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use bindings::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Smallest value a bound may shrink to.
///
/// Units: meters/second for the speed bound, radians for the angle bound.
pub const MIN_BOUND: f64 = 1e-6;

/// Largest value the steering angle bound may grow to.
///
/// The bicycle model uses `tan(angle)`, which is singular at 90 degrees.
///
/// Units: radians
pub const MAX_ANGLE_BOUND_RAD: f64 = std::f64::consts::FRAC_PI_2 - 1e-3;

/// Number of bound rescales after which the help banner is shown again.
pub const HELP_BANNER_PERIOD: u32 = 15;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during CmdShaper operation.
#[derive(Debug, thiserror::Error)]
pub enum CmdShaperError {
    #[error("The parameter {0} must be a finite number greater than zero, found {1}")]
    NonPositiveParam(&'static str, f64),

    #[error(
        "The steering angle bound ({0} deg) must be at most {max:.3} deg, as tan(angle) is \
         singular at 90 deg",
        max = MAX_ANGLE_BOUND_RAD.to_degrees()
    )]
    SteerSingularity(f64),

    #[error("CmdShaper has not been initialised")]
    NotInit,
}
