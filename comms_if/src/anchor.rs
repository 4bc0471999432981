//! # Anchor pose messages
//!
//! An anchor is an externally estimated pose of the odometry frame in the map frame, typically
//! provided by an operator setting an initial pose on a map.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Quaternion, Vector3};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pose of the odom frame in the map frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPose {
    /// Position of the odom frame origin in the map frame.
    ///
    /// Units: meters
    pub position_m: Vector3<f64>,

    /// Attitude of the odom frame in the map frame, as received.
    pub attitude_q: Quaternion<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AnchorPose {
    /// Returns `true` if every component of the pose is a finite number.
    pub fn is_finite(&self) -> bool {
        self.position_m.iter().all(|v| v.is_finite())
            && self.attitude_q.coords.iter().all(|v| v.is_finite())
    }
}

impl Default for AnchorPose {
    /// The map origin with the identity attitude.
    fn default() -> Self {
        Self {
            position_m: Vector3::zeros(),
            attitude_q: Quaternion::identity(),
        }
    }
}
