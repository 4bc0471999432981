//! Keyboard teleoperation executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Initialise the network adapters, unless running offline
//!     - Switch the terminal into raw mode
//!     - Main loop, see `teleop_lib::ctrl_loop`:
//!         - Key input acquisition
//!         - Anchor pose acquisition
//!         - Command shaping
//!         - Bicycle kinematics and pose integration
//!         - Odometry telemetry
//!     - Restore the terminal and end the session

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::info;
use structopt::StructOpt;

// Internal
use comms_if::net::NetParams;
use teleop_lib::{
    anchor_client::{AnchorClient, NoAnchor},
    bicycle::VehicleGeometry,
    cmd_shaper::{self, log_help_banner},
    ctrl_loop::{AnchorSource, CtrlLoop, OdomSink},
    key_src::TermKeySource,
    params::TeleopExecParams,
    tm_server::{LogSink, TmServer},
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Drive an Ackermann vehicle from the keyboard.
#[derive(Debug, StructOpt)]
#[structopt(name = "teleop_exec")]
struct Opt {
    /// Start in safety mode, where every cycle waits for a key press
    #[structopt(long)]
    safety: bool,

    /// Run without the network, odometry is written to the log instead of published
    #[structopt(long)]
    offline: bool,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("teleop_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Ackermann Teleop Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut cmd_shaper_params: cmd_shaper::Params =
        util::params::load("cmd_shaper.toml").wrap_err("Could not load CmdShaper params")?;
    let geometry: VehicleGeometry =
        util::params::load("bicycle.toml").wrap_err("Could not load vehicle geometry")?;
    let exec_params: TeleopExecParams =
        util::params::load("teleop_exec.toml").wrap_err("Could not load exec params")?;

    if opt.safety {
        cmd_shaper_params.safety_mode = true;
    }

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    let mut ctrl_loop = CtrlLoop::new(
        cmd_shaper_params,
        geometry,
        exec_params.key_poll_timeout(),
    )
    .wrap_err("Failed to initialise the control loop")?;

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    // The context must outlive the sockets created from it
    let zmq_ctx = comms_if::net::zmq::Context::new();

    let (mut sink, mut anchors): (Box<dyn OdomSink>, Box<dyn AnchorSource>) = if opt.offline {
        info!("Running offline, odometry will only be logged");
        (
            Box::new(LogSink) as Box<dyn OdomSink>,
            Box::new(NoAnchor) as Box<dyn AnchorSource>,
        )
    } else {
        info!("Initialising network");

        let net_params: NetParams =
            util::params::load("net.toml").wrap_err("Could not load net params")?;

        let tm_server =
            TmServer::new(&zmq_ctx, &net_params).wrap_err("Failed to initialise TmServer")?;
        info!("TmServer initialised");

        let anchor_client = AnchorClient::new(&zmq_ctx, &net_params)
            .wrap_err("Failed to initialise AnchorClient")?;
        info!("AnchorClient initialised");

        info!("Network initialisation complete");

        (
            Box::new(tm_server) as Box<dyn OdomSink>,
            Box::new(anchor_client) as Box<dyn AnchorSource>,
        )
    };

    // ---- MAIN LOOP ----

    log_help_banner();
    ctrl_loop.cmd_shaper().log_bounds();

    let loop_result = {
        // Raw mode lasts until the key source goes out of scope, whatever the loop returns
        let mut keys = TermKeySource::new().wrap_err("Failed to take control of the terminal")?;

        ctrl_loop.run(&mut keys, sink.as_mut(), anchors.as_mut())
    };

    // ---- SHUTDOWN ----

    info!("End of execution");

    // Sockets must be closed before the context is dropped
    drop(sink);
    drop(anchors);

    session.exit();

    loop_result.wrap_err("The teleop loop failed")
}
