//! # Pose integration
//!
//! Dead reckoning of the vehicle pose in the odometry frame from the bicycle model derivatives.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::trace;
use nalgebra::UnitQuaternion;
use serde::Serialize;
use std::fmt;

use crate::bicycle::Derivatives;
use util::module::State;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Planar pose of the vehicle in the odometry frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Pose2D {
    /// Units: meters
    pub x_m: f64,

    /// Units: meters
    pub y_m: f64,

    /// Heading about `+Z`, accumulated without wrapping.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// Pose integrator state.
///
/// The pose starts at the odometry frame origin and is only ever advanced.
#[derive(Debug, Default)]
pub struct PoseInteg {
    pose: Pose2D,
}

/// Input data to the integrator for one cycle.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    pub derivs: Derivatives,

    /// Time elapsed since the previous cycle.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// Output of one integration step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutputData {
    pub pose: Pose2D,

    /// Linear velocity in the odometry frame.
    ///
    /// Units: meters/second
    pub vel_ms: [f64; 2],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusReport {
    /// The step was skipped because the time delta was not positive.
    pub dt_skipped: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose2D {
    /// Attitude quaternion equivalent to the heading.
    pub fn attitude_q(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(0.0, 0.0, self.heading_rad)
    }
}

impl fmt::Display for Pose2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(x: {:.3} m, y: {:.3} m, heading: {:.3} rad)",
            self.x_m, self.y_m, self.heading_rad
        )
    }
}

impl State for PoseInteg {
    type InitData = ();
    type InitError = std::convert::Infallible;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = std::convert::Infallible;

    /// Reset the pose to the origin.
    fn init(&mut self, _init_data: Self::InitData) -> Result<(), Self::InitError> {
        self.pose = Pose2D::default();
        Ok(())
    }

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let dt_skipped = !(input_data.dt_s.is_finite() && input_data.dt_s > 0.0);

        let output = self.advance(&input_data.derivs, input_data.dt_s);

        Ok((output, StatusReport { dt_skipped }))
    }
}

impl PoseInteg {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the pose by one step of `dt_s` seconds.
    ///
    /// The heading is advanced first, and the displacement uses the velocity at the new
    /// heading.
    ///
    /// If `dt_s` is not a positive finite number the pose is left unchanged, and the returned
    /// velocity is evaluated at the current heading.
    pub fn advance(&mut self, derivs: &Derivatives, dt_s: f64) -> OutputData {
        if !(dt_s.is_finite() && dt_s > 0.0) {
            trace!("Skipping integration step, dt = {} s", dt_s);

            return OutputData {
                pose: self.pose,
                vel_ms: derivs.velocity_at(self.pose.heading_rad),
            };
        }

        self.pose.heading_rad += derivs.delta_heading_rad;

        let vel_ms = derivs.velocity_at(self.pose.heading_rad);

        self.pose.x_m += vel_ms[0] * dt_s;
        self.pose.y_m += vel_ms[1] * dt_s;

        OutputData {
            pose: self.pose,
            vel_ms,
        }
    }

    pub fn pose(&self) -> Pose2D {
        self.pose
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bicycle::{derive, VehicleGeometry},
        cmd_shaper::Command,
    };
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn derivs(speed: f64, angle: f64) -> Derivatives {
        derive(
            &Command {
                target_speed_ms: speed,
                target_angle_rad: angle,
            },
            &VehicleGeometry::default(),
        )
    }

    #[test]
    fn test_straight_line() {
        let mut integ = PoseInteg::new();

        let out = integ.advance(&derivs(1.0, 0.0), 1.0);

        assert_eq!(out.pose.x_m, 1.0);
        assert_eq!(out.pose.y_m, 0.0);
        assert_eq!(out.pose.heading_rad, 0.0);
        assert_eq!(out.vel_ms, [1.0, 0.0]);

        // Non uniform steps keep going straight
        for dt in [0.1, 0.35, 0.05].iter() {
            integ.advance(&derivs(1.0, 0.0), *dt);
        }
        assert_relative_eq!(integ.pose().x_m, 1.5);
        assert_eq!(integ.pose().y_m, 0.0);
    }

    #[test]
    fn test_zero_and_negative_dt_are_no_ops() {
        let mut integ = PoseInteg::new();
        integ.advance(&derivs(2.0, 0.2), 0.1);
        let before = integ.pose();

        for dt in [0.0, -0.1, -1e9, f64::NAN, f64::INFINITY].iter() {
            let (out, report) = integ
                .proc(&InputData {
                    derivs: derivs(3.0, -0.4),
                    dt_s: *dt,
                })
                .unwrap();

            assert!(report.dt_skipped);
            assert_eq!(out.pose, before);
            assert_eq!(integ.pose(), before);
        }
    }

    #[test]
    fn test_heading_advanced_before_displacement() {
        let mut integ = PoseInteg::new();
        let d = Derivatives {
            slip_angle_rad: 0.0,
            delta_heading_rad: FRAC_PI_2,
            speed_ms: 1.0,
        };

        let out = integ.advance(&d, 2.0);

        // The whole displacement uses the new heading, so the vehicle moves along +Y
        assert_relative_eq!(out.pose.x_m, 0.0, epsilon = 1e-12);
        assert_relative_eq!(out.pose.y_m, 2.0);
        assert_relative_eq!(out.vel_ms[1], 1.0);
    }

    #[test]
    fn test_heading_is_unwrapped() {
        let mut integ = PoseInteg::new();
        let d = Derivatives {
            slip_angle_rad: 0.0,
            delta_heading_rad: 1.0,
            speed_ms: 0.0,
        };

        for _ in 0..10 {
            integ.advance(&d, 0.1);
        }

        assert_relative_eq!(integ.pose().heading_rad, 10.0);
        assert!(integ.pose().heading_rad > 2.0 * PI);
    }

    #[test]
    fn test_skipped_step_velocity_at_current_heading() {
        let mut integ = PoseInteg::new();
        integ.advance(
            &Derivatives {
                slip_angle_rad: 0.0,
                delta_heading_rad: PI,
                speed_ms: 0.0,
            },
            0.1,
        );

        let out = integ.advance(&derivs(1.0, 0.0), 0.0);
        assert_relative_eq!(out.vel_ms[0], -1.0);
        assert_relative_eq!(out.pose.heading_rad, PI);
    }

    #[test]
    fn test_init_resets_pose() {
        let mut integ = PoseInteg::new();
        integ.advance(&derivs(1.0, 0.3), 0.5);
        assert_ne!(integ.pose(), Pose2D::default());

        integ.init(()).unwrap();
        assert_eq!(integ.pose(), Pose2D::default());
    }

    #[test]
    fn test_attitude_q() {
        let pose = Pose2D {
            x_m: 0.0,
            y_m: 0.0,
            heading_rad: FRAC_PI_2,
        };

        let q = pose.attitude_q();
        assert_relative_eq!(q.euler_angles().2, FRAC_PI_2);
        assert_relative_eq!(q.angle(), FRAC_PI_2);
    }
}
