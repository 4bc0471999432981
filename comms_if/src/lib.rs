//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the teleoperation software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Anchor (map frame initial pose) messages
pub mod anchor;

/// Network module
pub mod net;

/// Odometry and transform telemetry messages
pub mod odom;
