//! # Bicycle kinematics
//!
//! Single track kinematic model of an Ackermann steered vehicle. The front and rear axles are
//! each collapsed into one wheel, and the vehicle velocity is defined at a reference point a
//! fixed distance ahead of the rear axle.
//!
//! All functions here are pure.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::cmd_shaper::Command;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Fixed geometry of the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct VehicleGeometry {
    /// Distance between the front and rear axles.
    ///
    /// Units: meters
    pub wheelbase_m: f64,

    /// Distance from the rear axle to the velocity reference point, must be
    /// between zero and the wheelbase.
    ///
    /// Units: meters
    pub rear_axle_to_cg_m: f64,
}

/// Kinematic quantities derived from a command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Derivatives {
    /// Angle between the vehicle heading and its velocity vector.
    ///
    /// Units: radians
    pub slip_angle_rad: f64,

    /// Heading change applied in one integration step.
    ///
    /// Units: radians
    pub delta_heading_rad: f64,

    /// Units: meters/second
    pub speed_ms: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BicycleError {
    #[error("The wheelbase must be a finite number greater than zero, found {0} m")]
    InvalidWheelbase(f64),

    #[error(
        "The rear axle to CG distance must be between zero and the wheelbase ({1} m), found {0} m"
    )]
    InvalidRearAxleToCg(f64, f64),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for VehicleGeometry {
    fn default() -> Self {
        Self {
            wheelbase_m: 1.05,
            rear_axle_to_cg_m: 0.525,
        }
    }
}

impl VehicleGeometry {
    pub fn validate(&self) -> Result<(), BicycleError> {
        if !(self.wheelbase_m.is_finite() && self.wheelbase_m > 0.0) {
            return Err(BicycleError::InvalidWheelbase(self.wheelbase_m));
        }

        if !(self.rear_axle_to_cg_m > 0.0 && self.rear_axle_to_cg_m < self.wheelbase_m) {
            return Err(BicycleError::InvalidRearAxleToCg(
                self.rear_axle_to_cg_m,
                self.wheelbase_m,
            ));
        }

        Ok(())
    }
}

impl Derivatives {
    /// Velocity of the vehicle in the odometry frame when it points along
    /// `heading_rad`.
    ///
    /// Units: meters/second
    pub fn velocity_at(&self, heading_rad: f64) -> [f64; 2] {
        let course_rad = heading_rad + self.slip_angle_rad;

        [
            self.speed_ms * course_rad.cos(),
            self.speed_ms * course_rad.sin(),
        ]
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Derive the slip angle and heading increment for the given command.
///
/// The steering angle must be clear of +/-90 degrees, which the command shaper's angle bound
/// guarantees.
pub fn derive(cmd: &Command, geom: &VehicleGeometry) -> Derivatives {
    let slip_angle_rad =
        ((geom.rear_axle_to_cg_m / geom.wheelbase_m) * cmd.target_angle_rad.tan()).atan();

    // Heading is advanced by a fixed increment per step, not by rate * dt
    let delta_heading_rad = (cmd.target_speed_ms / geom.rear_axle_to_cg_m) * slip_angle_rad.sin();

    Derivatives {
        slip_angle_rad,
        delta_heading_rad,
        speed_ms: cmd.target_speed_ms,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn cmd(speed: f64, angle: f64) -> Command {
        Command {
            target_speed_ms: speed,
            target_angle_rad: angle,
        }
    }

    #[test]
    fn test_straight_has_no_slip() {
        let d = derive(&cmd(1.0, 0.0), &VehicleGeometry::default());

        assert_eq!(d.slip_angle_rad, 0.0);
        assert_eq!(d.delta_heading_rad, 0.0);
        assert_eq!(d.velocity_at(0.0), [1.0, 0.0]);
    }

    #[test]
    fn test_slip_angle_values() {
        let geom = VehicleGeometry::default();
        let angle = 20f64.to_radians();

        let d = derive(&cmd(2.0, angle), &geom);

        // Half the wheelbase, so the slip is atan(tan(angle) / 2)
        let beta = (0.5 * angle.tan()).atan();
        assert_relative_eq!(d.slip_angle_rad, beta);
        assert_relative_eq!(d.delta_heading_rad, (2.0 / 0.525) * beta.sin());
        assert_eq!(d.speed_ms, 2.0);
    }

    #[test]
    fn test_sign_conventions() {
        let geom = VehicleGeometry::default();

        // Left steer forwards turns left, reversing turns the other way
        let fwd_left = derive(&cmd(1.0, 0.1), &geom);
        let rev_left = derive(&cmd(-1.0, 0.1), &geom);
        let fwd_right = derive(&cmd(1.0, -0.1), &geom);

        assert!(fwd_left.slip_angle_rad > 0.0);
        assert!(fwd_left.delta_heading_rad > 0.0);
        assert!(rev_left.delta_heading_rad < 0.0);
        assert_relative_eq!(fwd_right.delta_heading_rad, -fwd_left.delta_heading_rad);
    }

    #[test]
    fn test_stopped_vehicle_does_not_turn() {
        let d = derive(&cmd(0.0, 0.3), &VehicleGeometry::default());

        assert!(d.slip_angle_rad > 0.0);
        assert_eq!(d.delta_heading_rad, 0.0);
        assert_eq!(d.velocity_at(1.0), [0.0, 0.0]);
    }

    #[test]
    fn test_velocity_uses_course() {
        let d = Derivatives {
            slip_angle_rad: 0.25,
            delta_heading_rad: 0.0,
            speed_ms: 2.0,
        };

        let v = d.velocity_at(FRAC_PI_2 - 0.25);
        assert_relative_eq!(v[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(v[1], 2.0);
    }

    #[test]
    fn test_geometry_validation() {
        assert!(VehicleGeometry::default().validate().is_ok());

        assert!(matches!(
            VehicleGeometry {
                wheelbase_m: 0.0,
                rear_axle_to_cg_m: 0.5
            }
            .validate(),
            Err(BicycleError::InvalidWheelbase(_))
        ));

        for lr in [0.0, -0.1, 1.05, 2.0, f64::NAN].iter() {
            assert!(matches!(
                VehicleGeometry {
                    wheelbase_m: 1.05,
                    rear_axle_to_cg_m: *lr
                }
                .validate(),
                Err(BicycleError::InvalidRearAxleToCg(_, _))
            ));
        }
    }
}
