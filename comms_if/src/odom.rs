//! # Odometry telemetry
//!
//! Messages published by the teleop executable every cycle. A single [`OdomTm`] packet carries
//! the two transforms of the `map -> odom -> base_footprint` chain and the odometry record.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_nanoseconds, DateTime, Utc};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::anchor::AnchorPose;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Name of the global map frame.
pub const MAP_FRAME: &str = "map";

/// Name of the locally integrated odometry frame.
pub const ODOM_FRAME: &str = "odom";

/// Name of the robot's ground-projected body frame.
pub const BASE_FRAME: &str = "base_footprint";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A rigid transform between two named frames.
///
/// The transform expresses the pose of `child_frame` in `parent_frame`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedTransform {
    /// UTC time at which the transform was valid
    #[serde(with = "ts_nanoseconds")]
    pub timestamp: DateTime<Utc>,

    pub parent_frame: String,

    pub child_frame: String,

    /// Translation of the child frame origin in the parent frame.
    ///
    /// Units: meters
    pub translation_m: Vector3<f64>,

    /// Rotation of the child frame relative to the parent frame.
    ///
    /// Not necessarily normalised, anchor transforms are passed through as received.
    pub rotation_q: Quaternion<f64>,
}

/// Odometry record, the robot pose and twist in the odometry frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Odometry {
    #[serde(with = "ts_nanoseconds")]
    pub timestamp: DateTime<Utc>,

    /// Frame the pose is expressed in
    pub frame_id: String,

    /// Frame the twist is attached to
    pub child_frame_id: String,

    /// Units: meters
    pub position_m: Vector3<f64>,

    pub attitude_q: UnitQuaternion<f64>,

    /// Linear velocity.
    ///
    /// Units: meters/second
    pub lin_vel_ms: Vector3<f64>,

    /// Angular velocity.
    ///
    /// Units: radians/second
    pub ang_vel_rads: Vector3<f64>,
}

/// Telemetry packet sent once per teleop cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdomTm {
    /// `odom -> base_footprint`
    pub odom_to_base: StampedTransform,

    /// `map -> odom`
    pub map_to_odom: StampedTransform,

    pub odom: Odometry,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OdomTm {
    /// Build the telemetry packet for one cycle.
    ///
    /// # Arguments
    /// - `timestamp`: time of the cycle, used to stamp every part of the packet
    /// - `position_m`: planar position of the robot in the odom frame
    /// - `heading_rad`: heading of the robot in the odom frame, about `+Z`
    /// - `lin_vel_ms`: planar velocity of the robot in the odom frame
    /// - `anchor`: latest anchor of the odom frame in the map frame
    pub fn new(
        timestamp: DateTime<Utc>,
        position_m: [f64; 2],
        heading_rad: f64,
        lin_vel_ms: [f64; 2],
        anchor: &AnchorPose,
    ) -> Self {
        let position_m = Vector3::new(position_m[0], position_m[1], 0.0);
        let attitude_q = UnitQuaternion::from_euler_angles(0.0, 0.0, heading_rad);

        Self {
            odom_to_base: StampedTransform {
                timestamp,
                parent_frame: ODOM_FRAME.into(),
                child_frame: BASE_FRAME.into(),
                translation_m: position_m,
                rotation_q: attitude_q.into_inner(),
            },
            map_to_odom: StampedTransform {
                timestamp,
                parent_frame: MAP_FRAME.into(),
                child_frame: ODOM_FRAME.into(),
                translation_m: anchor.position_m,
                rotation_q: anchor.attitude_q,
            },
            odom: Odometry {
                timestamp,
                frame_id: ODOM_FRAME.into(),
                child_frame_id: BASE_FRAME.into(),
                position_m,
                attitude_q,
                lin_vel_ms: Vector3::new(lin_vel_ms[0], lin_vel_ms[1], 0.0),
                ang_vel_rads: Vector3::zeros(),
            },
        }
    }
}
