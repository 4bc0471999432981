//! # Teleop library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the teleop crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Anchor client - recieves the pose of the odometry frame in the map frame
pub mod anchor_client;

/// Bicycle kinematics - slip angle and heading increment of an Ackermann vehicle
pub mod bicycle;

/// Command shaping module - converts key presses into a bounded speed and steering command
pub mod cmd_shaper;

/// Control loop - runs the teleop cycle
pub mod ctrl_loop;

/// Key source - reads operator key presses from the terminal
pub mod key_src;

/// Teleop executable parameters
pub mod params;

/// Pose integration module - dead reckons the vehicle pose
pub mod pose_integ;

/// Telemetry server - publishes odometry
pub mod tm_server;
