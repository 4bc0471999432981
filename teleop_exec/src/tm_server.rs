//! # TM Server
//!
//! Publishes the odometry telemetry packet produced by each teleop cycle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{log_enabled, trace, Level};

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    odom::OdomTm,
};

use crate::ctrl_loop::OdomSink;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TmServer {
    socket: MonitoredSocket,
}

/// Sink which writes the telemetry to the log instead of the network.
#[derive(Debug, Default)]
pub struct LogSink;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TmServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send telemetry: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the telemetry: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TmServer {
    /// Create a new instance of the TM Server.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, TmServerError> {
        let socket_options = SocketOptions {
            bind: true,
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, &params.odom_endpoint)
            .map_err(TmServerError::SocketError)?;

        Ok(Self { socket })
    }

    /// Returns `true` if at least one subscriber is connected.
    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    pub fn send(&mut self, tm: &OdomTm) -> Result<(), TmServerError> {
        let packet_string = serde_json::to_string(tm).map_err(TmServerError::SerializationError)?;

        self.socket
            .send(&packet_string, 0)
            .map_err(TmServerError::SendError)
    }
}

impl OdomSink for TmServer {
    fn publish(&mut self, tm: &OdomTm) -> Result<(), TmServerError> {
        self.send(tm)
    }
}

impl OdomSink for LogSink {
    fn publish(&mut self, tm: &OdomTm) -> Result<(), TmServerError> {
        if log_enabled!(Level::Trace) {
            let packet_string =
                serde_json::to_string(tm).map_err(TmServerError::SerializationError)?;
            trace!("OdomTm: {}", packet_string);
        }
        Ok(())
    }
}
