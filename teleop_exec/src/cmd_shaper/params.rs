//! Parameters structure for CmdShaper

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use super::{CmdShaperError, MAX_ANGLE_BOUND_RAD};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for command shaping.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// If true the executable starts in safety mode, where every cycle waits for
    /// the operator to press a key.
    pub safety_mode: bool,

    /// Speed added or removed by one press of a speed key.
    ///
    /// Units: meters/second
    pub speed_increment_ms: f64,

    /// Steering angle added or removed by one press of a steer key.
    ///
    /// Units: degrees
    pub angle_increment_deg: f64,

    /// Initial absolute limit on the target speed.
    ///
    /// Units: meters/second
    pub speed_bound_ms: f64,

    /// Initial absolute limit on the target steering angle. Must be less than
    /// 90 degrees.
    ///
    /// Units: degrees
    pub angle_bound_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            safety_mode: false,
            speed_increment_ms: 0.5,
            angle_increment_deg: 0.2,
            speed_bound_ms: 3.0,
            angle_bound_deg: 29.0,
        }
    }
}

impl Params {
    /// Check the parameters describe a usable command shaper.
    pub fn validate(&self) -> Result<(), CmdShaperError> {
        for (name, value) in [
            ("speed_increment_ms", self.speed_increment_ms),
            ("angle_increment_deg", self.angle_increment_deg),
            ("speed_bound_ms", self.speed_bound_ms),
            ("angle_bound_deg", self.angle_bound_deg),
        ]
        .iter()
        {
            if !(value.is_finite() && *value > 0.0) {
                return Err(CmdShaperError::NonPositiveParam(*name, *value));
            }
        }

        // The runtime ceiling on the angle bound applies to the configured value too
        if self.angle_bound_deg.to_radians() > MAX_ANGLE_BOUND_RAD {
            return Err(CmdShaperError::SteerSingularity(self.angle_bound_deg));
        }

        Ok(())
    }
}
