//! # Control loop
//!
//! Drives one teleop cycle at a time:
//!
//! - Compute the time elapsed since the previous cycle
//! - Read one key, waiting for a bounded time in standard mode or indefinitely in safety mode
//! - Update the command from the key
//! - Derive the bicycle model quantities and advance the pose
//! - Publish the transforms and odometry
//!
//! The loop owns all of the vehicle state. Adapters for the terminal and the network are passed
//! in through the [`KeySource`], [`OdomSink`] and [`AnchorSource`] traits.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use log::{info, trace, warn};
use std::time::{Duration, Instant};

use comms_if::{anchor::AnchorPose, odom::OdomTm};
use util::module::State;

use crate::{
    bicycle::{self, BicycleError, Derivatives, VehicleGeometry},
    cmd_shaper::{self, CmdShaper, CmdShaperError, Command},
    key_src::{KeySource, KeySrcError, ReadMode},
    pose_integ::{self, PoseInteg},
    tm_server::TmServerError,
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Destination of the telemetry produced each cycle.
pub trait OdomSink {
    fn publish(&mut self, tm: &OdomTm) -> Result<(), TmServerError>;
}

/// Provider of anchor poses.
pub trait AnchorSource {
    /// Get the newest anchor pose received since the last call, if any.
    fn latest(&mut self) -> Option<AnchorPose>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Teleop control loop state.
pub struct CtrlLoop {
    cmd_shaper: CmdShaper,

    geometry: VehicleGeometry,

    pose_integ: PoseInteg,

    anchor: AnchorPose,

    key_poll_timeout: Duration,

    num_cycles: u64,
}

/// Everything produced by a single cycle.
#[derive(Debug, Clone)]
pub struct CycleOutput {
    pub cmd: Command,

    pub cmd_status: cmd_shaper::StatusReport,

    pub derivs: Derivatives,

    pub integ: pose_integ::OutputData,

    pub integ_status: pose_integ::StatusReport,

    pub tm: OdomTm,

    /// The operator asked to quit during this cycle.
    pub quit: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CtrlLoopError {
    #[error("Command shaper error: {0}")]
    CmdShaperError(CmdShaperError),

    #[error("Invalid vehicle geometry: {0}")]
    GeometryError(BicycleError),

    #[error("Could not read a key: {0}")]
    KeySrcError(KeySrcError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CtrlLoop {
    /// Create a new loop with the pose at the origin and the default anchor.
    pub fn new(
        cmd_shaper_params: cmd_shaper::Params,
        geometry: VehicleGeometry,
        key_poll_timeout: Duration,
    ) -> Result<Self, CtrlLoopError> {
        geometry.validate().map_err(CtrlLoopError::GeometryError)?;

        Ok(Self {
            cmd_shaper: CmdShaper::new(cmd_shaper_params).map_err(CtrlLoopError::CmdShaperError)?,
            geometry,
            pose_integ: PoseInteg::new(),
            anchor: AnchorPose::default(),
            key_poll_timeout,
            num_cycles: 0,
        })
    }

    /// Set the anchor pose used for the `map -> odom` transform from the next cycle onwards.
    pub fn set_anchor_pose(&mut self, anchor: AnchorPose) {
        self.anchor = anchor;
    }

    pub fn anchor_pose(&self) -> AnchorPose {
        self.anchor
    }

    pub fn cmd_shaper(&self) -> &CmdShaper {
        &self.cmd_shaper
    }

    pub fn pose(&self) -> pose_integ::Pose2D {
        self.pose_integ.pose()
    }

    pub fn num_cycles(&self) -> u64 {
        self.num_cycles
    }

    /// The key read mode for the next cycle.
    pub fn read_mode(&self) -> ReadMode {
        ReadMode::for_safety_mode(self.cmd_shaper.safety_mode(), self.key_poll_timeout)
    }

    /// Run a single cycle with an already read key.
    ///
    /// # Arguments
    /// - `key`: the key read this cycle, `None` if there wasn't one
    /// - `dt_s`: the time elapsed since the previous cycle
    /// - `timestamp`: the time to stamp the telemetry with
    pub fn cycle(
        &mut self,
        key: Option<char>,
        dt_s: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<CycleOutput, CtrlLoopError> {
        let (cmd_out, cmd_status) = self
            .cmd_shaper
            .proc(&key)
            .map_err(CtrlLoopError::CmdShaperError)?;

        let derivs = bicycle::derive(&cmd_out.cmd, &self.geometry);

        let (integ, integ_status) = match self.pose_integ.proc(&pose_integ::InputData {
            derivs,
            dt_s,
        }) {
            Ok(o) => o,
            Err(e) => match e {},
        };

        let tm = OdomTm::new(
            timestamp,
            [integ.pose.x_m, integ.pose.y_m],
            integ.pose.heading_rad,
            integ.vel_ms,
            &self.anchor,
        );

        self.num_cycles += 1;

        Ok(CycleOutput {
            cmd: cmd_out.cmd,
            cmd_status,
            derivs,
            integ,
            integ_status,
            tm,
            quit: cmd_out.quit,
        })
    }

    /// Run cycles until the quit key is pressed or the key source fails.
    ///
    /// Publish failures are logged and do not stop the loop. A key source failure ends the loop
    /// before the failed cycle touches any state.
    pub fn run(
        &mut self,
        keys: &mut dyn KeySource,
        sink: &mut dyn OdomSink,
        anchors: &mut dyn AnchorSource,
    ) -> Result<(), CtrlLoopError> {
        info!("Begining teleop loop");

        let mut last_cycle_instant = Instant::now();

        loop {
            // ---- CYCLE TIMING ----

            let cycle_start_instant = Instant::now();
            let dt_s = (cycle_start_instant - last_cycle_instant).as_secs_f64();
            last_cycle_instant = cycle_start_instant;

            // ---- DATA INPUT ----

            let key = keys
                .read_key(self.read_mode())
                .map_err(CtrlLoopError::KeySrcError)?;

            if let Some(anchor) = anchors.latest() {
                self.set_anchor_pose(anchor);
            }

            // ---- PROCESSING ----

            let out = self.cycle(key, dt_s, Utc::now())?;

            trace!("Cycle {}: pose {}", self.num_cycles, out.integ.pose);

            // ---- TELEMETRY ----

            if let Err(e) = sink.publish(&out.tm) {
                warn!("TmServer error: {}", e);
            }

            if out.quit {
                info!("Quit key pressed, stopping");
                break;
            }
        }

        info!("Teleop loop ended after {} cycles", self.num_cycles);

        Ok(())
    }
}
